//! Bytecode cursor with lazy jump-destination analysis

use crate::opcode::Opcode;

/// Program counter over immutable code.
///
/// PUSH-data positions are classified by a forward scan that only ever advances, so
/// a position is analysed at most once however often it is queried.
#[derive(Clone, Debug)]
pub struct CodeStream {
    code: Vec<u8>,
    pc: usize,
    push_data: Vec<bool>,
    scanned_to: usize,
}

impl CodeStream {
    /// Cursor at position 0
    pub fn new(code: Vec<u8>) -> Self {
        let push_data = vec![false; code.len()];
        Self {
            code,
            pc: 0,
            push_data,
            scanned_to: 0,
        }
    }

    /// Code length
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether there is no code
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Raw code
    pub fn as_slice(&self) -> &[u8] {
        &self.code
    }

    /// Position of the next opcode
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Move the cursor; positions past the end read as STOP
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    /// Opcode at the cursor, advancing it; STOP once past the end
    pub fn next_opcode(&mut self) -> u8 {
        match self.code.get(self.pc) {
            Some(opcode) => {
                self.pc += 1;
                *opcode
            }
            None => Opcode::STOP as u8,
        }
    }

    /// Opcode at the cursor without moving it
    pub fn peek(&self) -> u8 {
        self.code.get(self.pc).copied().unwrap_or(Opcode::STOP as u8)
    }

    /// Up to `size` immediate bytes at the cursor; the cursor moves by `size` regardless
    pub fn read(&mut self, size: usize) -> &[u8] {
        let start = self.pc.min(self.code.len());
        let end = self.pc.saturating_add(size).min(self.code.len());
        self.pc = self.pc.saturating_add(size);
        &self.code[start..end]
    }

    /// Whether `position` starts an instruction rather than sitting inside PUSH data
    pub fn is_valid_opcode(&mut self, position: usize) -> bool {
        if position >= self.code.len() {
            return false;
        }
        while self.scanned_to <= position {
            let opcode = self.code[self.scanned_to];
            let immediate = Opcode::immediate_size(opcode);
            let data_start = self.scanned_to + 1;
            let data_end = (data_start + immediate).min(self.code.len());
            for slot in &mut self.push_data[data_start.min(data_end)..data_end] {
                *slot = true;
            }
            self.scanned_to = data_start + immediate;
        }
        !self.push_data[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_and_stop_past_end() {
        let mut code = CodeStream::new(vec![0x60, 0x01, 0x01]);
        assert_eq!(code.next_opcode(), 0x60);
        assert_eq!(code.read(1), &[0x01]);
        assert_eq!(code.next_opcode(), 0x01);
        assert_eq!(code.next_opcode(), 0x00);
        assert_eq!(code.next_opcode(), 0x00);
        assert_eq!(code.pc(), 3);
    }

    #[test]
    fn test_truncated_push_read() {
        // PUSH2 with only one immediate byte
        let mut code = CodeStream::new(vec![0x61, 0xff]);
        code.next_opcode();
        assert_eq!(code.read(2), &[0xff]);
        assert_eq!(code.pc(), 3);
        assert_eq!(code.peek(), 0x00);
    }

    #[test]
    fn test_peek_does_not_move() {
        let mut code = CodeStream::new(vec![0x5b, 0x00]);
        assert_eq!(code.peek(), 0x5b);
        assert_eq!(code.pc(), 0);
        code.set_pc(100);
        assert_eq!(code.peek(), 0x00);
    }

    #[test]
    fn test_push_data_is_not_valid() {
        // PUSH1 0x5b, JUMPDEST, PUSH2 0x5b 0x5b
        let mut code = CodeStream::new(vec![0x60, 0x5b, 0x5b, 0x61, 0x5b, 0x5b]);
        assert!(code.is_valid_opcode(0));
        assert!(!code.is_valid_opcode(1));
        assert!(code.is_valid_opcode(2));
        assert!(code.is_valid_opcode(3));
        assert!(!code.is_valid_opcode(4));
        assert!(!code.is_valid_opcode(5));
        assert!(!code.is_valid_opcode(6));
    }

    #[test]
    fn test_out_of_order_queries() {
        let mut code = CodeStream::new(vec![0x7f; 40]);
        // PUSH32 at 0 covers 1..=32, so 33 is the next PUSH32
        assert!(code.is_valid_opcode(33));
        assert!(!code.is_valid_opcode(5));
        assert!(code.is_valid_opcode(0));
        assert!(!code.is_valid_opcode(39));
    }
}
