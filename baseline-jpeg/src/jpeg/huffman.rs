use crate::{
    bitstream::Bitstream,
    error::{Error, Result},
};

/// Table class from the `Tc` nibble of a DHT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HuffmanTableClass {
    /// Codes DC difference magnitude categories.
    Dc,
    /// Codes (run, size) pairs of AC coefficients.
    Ac,
}

// The root is node 0 and is never anyone's child, so 0 marks an empty slot.
const NO_CHILD: u32 = 0;

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    children: [u32; 2],
    symbol: Option<u8>,
}

/// Defines a JPEG huffman table, decoded through a binary trie stored as a node arena.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// `Tc`
    pub class: HuffmanTableClass,
    /// `Th`, 0 or 1 for baseline.
    pub destination_id: u8,
    /// Number of codes of each length from 1 to 16 bits.
    pub bitcode_counts: [u8; 16],
    /// Symbols in order of increasing code length.
    pub symbols: Vec<u8>,
    nodes: Vec<Node>,
}

impl HuffmanTable {
    /// Builds the canonical code for `bitcode_counts` (number of codes of each length 1..=16) and
    /// `symbols` (listed by increasing code length). `position` is the byte index of the table
    /// specification and is only used for error reporting.
    pub fn new(
        class: HuffmanTableClass,
        destination_id: u8,
        bitcode_counts: [u8; 16],
        symbols: Vec<u8>,
        position: usize,
    ) -> Result<Self> {
        let malformed = |reason| Error::MalformedHuffmanTable { reason, position };

        let total: usize = bitcode_counts.iter().map(|&count| count as usize).sum();
        if total != symbols.len() {
            return Err(malformed("symbol count does not match code length counts"));
        }

        let mut table = Self {
            class,
            destination_id,
            bitcode_counts,
            symbols,
            nodes: vec![Node::default()],
        };

        let mut code: u32 = 0;
        let mut symbol_index = 0;
        for (i, &count) in bitcode_counts.iter().enumerate() {
            let length = i as u8 + 1;
            code <<= 1;
            for _ in 0..count {
                if code >= 1 << length {
                    return Err(malformed("code lengths over-subscribe the code space"));
                }
                let symbol = table.symbols[symbol_index];
                table.insert(code, length, symbol).map_err(malformed)?;
                symbol_index += 1;
                code += 1;
            }
        }

        Ok(table)
    }

    fn insert(
        &mut self,
        code: u32,
        length: u8,
        symbol: u8,
    ) -> core::result::Result<(), &'static str> {
        let mut current = 0usize;
        for shift in (0..length).rev() {
            if self.nodes[current].symbol.is_some() {
                return Err("code is prefixed by a shorter code");
            }
            let bit = ((code >> shift) & 1) as usize;
            let mut child = self.nodes[current].children[bit];
            if child == NO_CHILD {
                child = self.nodes.len() as u32;
                self.nodes.push(Node::default());
                self.nodes[current].children[bit] = child;
            }
            current = child as usize;
        }

        let leaf = &mut self.nodes[current];
        if leaf.symbol.is_some() || leaf.children != [NO_CHILD; 2] {
            return Err("code collides with another code");
        }
        leaf.symbol = Some(symbol);
        Ok(())
    }

    /// Walks the trie one bit at a time until a leaf is reached (DECODE in T.81 F.2.2.3).
    pub fn decode_symbol(&self, bitstream: &mut Bitstream) -> Result<u8> {
        let mut current = 0usize;
        loop {
            let node = &self.nodes[current];
            if let Some(symbol) = node.symbol {
                return Ok(symbol);
            }

            if bitstream.is_exhausted() {
                return Err(Error::MalformedBlock {
                    reason: "entropy-coded data ended inside a Huffman code",
                    bit_position: bitstream.bit_position(),
                });
            }

            let child = node.children[bitstream.read_bit() as usize];
            if child == NO_CHILD {
                return Err(Error::MalformedBlock {
                    reason: "bit sequence is not a code of this Huffman table",
                    bit_position: bitstream.bit_position(),
                });
            }
            current = child as usize;
        }
    }

    /// Returns `(code, length, symbol)` for every symbol, in assignment order.
    pub fn codes(&self) -> Vec<(u16, u8, u8)> {
        let mut codes = Vec::with_capacity(self.symbols.len());
        let mut code: u32 = 0;
        let mut symbols = self.symbols.iter();
        for (i, &count) in self.bitcode_counts.iter().enumerate() {
            for _ in 0..count {
                if let Some(&symbol) = symbols.next() {
                    codes.push((code as u16, i as u8 + 1, symbol));
                }
                code += 1;
            }
            code <<= 1;
        }
        codes
    }
}
