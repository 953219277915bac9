//! Huffman prefix codes over 16-bit sample values
//!
//! The frequency table is what gets persisted; encoder and decoder both
//! rebuild the same tree from it, so construction has to be fully
//! deterministic. Ties on weight are broken by creation order: leaves are
//! numbered in ascending symbol order and every merged node takes the next
//! number.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use super::error::{CodecError, CodecResult};

/// bytes per serialized table entry: i16 symbol + u32 count
pub const TABLE_ENTRY_SIZE: usize = 6;

/// symbol -> occurrence count, iterated in ascending symbol order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<i16, u32>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: &[i16]) -> Self {
        let mut table = Self::new();
        for &sample in samples {
            table.add(sample);
        }
        table
    }

    pub fn add(&mut self, symbol: i16) {
        let count = self.counts.entry(symbol).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// number of distinct symbols
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i16, u32)> + '_ {
        self.counts.iter().map(|(&s, &c)| (s, c))
    }

    /// `{symbol: i16 BE, count: u32 BE}*` in ascending symbol order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.counts.len() * TABLE_ENTRY_SIZE);
        for (symbol, count) in self.iter() {
            out.extend_from_slice(&symbol.to_be_bytes());
            out.extend_from_slice(&count.to_be_bytes());
        }
        out
    }

    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        if data.len() % TABLE_ENTRY_SIZE != 0 {
            return Err(CodecError::corrupt(format!(
                "frequency table length {} is not a multiple of {}",
                data.len(),
                TABLE_ENTRY_SIZE
            )));
        }

        let mut counts = BTreeMap::new();
        let mut previous: Option<i16> = None;

        for entry in data.chunks_exact(TABLE_ENTRY_SIZE) {
            let symbol = i16::from_be_bytes([entry[0], entry[1]]);
            let count = u32::from_be_bytes([entry[2], entry[3], entry[4], entry[5]]);

            if count == 0 {
                return Err(CodecError::corrupt(format!(
                    "frequency table has zero count for {}",
                    symbol
                )));
            }
            if previous.is_some_and(|p| p >= symbol) {
                return Err(CodecError::corrupt(
                    "frequency table symbols are not strictly ascending",
                ));
            }

            previous = Some(symbol);
            counts.insert(symbol, count);
        }

        Ok(FrequencyTable { counts })
    }
}

/// arena node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Leaf { symbol: i16, weight: u64 },
    Internal { left: usize, right: usize, weight: u64 },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match *self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => weight,
        }
    }
}

/// Huffman tree stored as an arena; the root is the last node pushed.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
}

impl HuffmanTree {
    /// Merge the two lightest nodes until one remains.
    pub fn build(table: &FrequencyTable) -> Self {
        let mut nodes = Vec::with_capacity(table.len().saturating_mul(2));
        // (weight, sequence) is unique per node, so pop order is total
        let mut heap = BinaryHeap::with_capacity(table.len());

        for (symbol, count) in table.iter() {
            let weight = count as u64;
            heap.push(Reverse((weight, nodes.len())));
            nodes.push(Node::Leaf { symbol, weight });
        }

        while heap.len() > 1 {
            let (Some(Reverse((lw, left))), Some(Reverse((rw, right)))) = (heap.pop(), heap.pop())
            else {
                break;
            };
            let weight = lw + rw;
            heap.push(Reverse((weight, nodes.len())));
            nodes.push(Node::Internal {
                left,
                right,
                weight,
            });
        }

        HuffmanTree { nodes }
    }

    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// a code: the low `len` bits of `bits`, read MSB first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HuffmanCode {
    pub bits: u64,
    pub len: u8,
}

impl HuffmanCode {
    /// Render as a '0'/'1' string, handy in tests and logs.
    pub fn to_bit_string(&self) -> String {
        (0..self.len)
            .rev()
            .map(|i| if (self.bits >> i) & 1 == 1 { '1' } else { '0' })
            .collect()
    }
}

/// symbol <-> code maps derived from a tree
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    codes: HashMap<i16, HuffmanCode>,
    reverse: HashMap<HuffmanCode, i16>,
    max_len: u8,
}

impl CodeTable {
    pub fn from_table(table: &FrequencyTable) -> CodecResult<Self> {
        Self::from_tree(&HuffmanTree::build(table))
    }

    /// Walk the tree with an explicit stack, left = 0, right = 1.
    pub fn from_tree(tree: &HuffmanTree) -> CodecResult<Self> {
        let mut table = CodeTable::default();
        let Some(root) = tree.root() else {
            return Ok(table);
        };

        let mut stack = vec![(root, HuffmanCode { bits: 0, len: 0 })];
        while let Some((index, prefix)) = stack.pop() {
            let node = tree
                .node(index)
                .ok_or_else(|| CodecError::Internal(format!("dangling node index {}", index)))?;

            match *node {
                Node::Leaf { symbol, .. } => {
                    // a lone symbol still has to consume one bit
                    let code = if prefix.len == 0 {
                        HuffmanCode { bits: 0, len: 1 }
                    } else {
                        prefix
                    };
                    table.insert(symbol, code)?;
                }
                Node::Internal { left, right, .. } => {
                    if prefix.len >= 64 {
                        return Err(CodecError::Internal(
                            "huffman code longer than 64 bits".to_string(),
                        ));
                    }
                    let len = prefix.len + 1;
                    stack.push((
                        right,
                        HuffmanCode {
                            bits: (prefix.bits << 1) | 1,
                            len,
                        },
                    ));
                    stack.push((
                        left,
                        HuffmanCode {
                            bits: prefix.bits << 1,
                            len,
                        },
                    ));
                }
            }
        }

        Ok(table)
    }

    fn insert(&mut self, symbol: i16, code: HuffmanCode) -> CodecResult<()> {
        if self.codes.insert(symbol, code).is_some() || self.reverse.insert(code, symbol).is_some()
        {
            return Err(CodecError::Internal(format!(
                "symbol {} assigned twice",
                symbol
            )));
        }
        self.max_len = self.max_len.max(code.len);
        Ok(())
    }

    pub fn code(&self, symbol: i16) -> Option<HuffmanCode> {
        self.codes.get(&symbol).copied()
    }

    pub fn lookup(&self, code: HuffmanCode) -> Option<i16> {
        self.reverse.get(&code).copied()
    }

    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(entries: &[(i16, u32)]) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for &(symbol, count) in entries {
            for _ in 0..count {
                table.add(symbol);
            }
        }
        table
    }

    #[test]
    fn test_single_symbol_gets_zero_code() {
        let codes = CodeTable::from_table(&table_of(&[(42, 9)])).unwrap();
        assert_eq!(codes.code(42).unwrap().to_bit_string(), "0");
        assert_eq!(codes.max_len(), 1);
    }

    #[test]
    fn test_empty_table() {
        let codes = CodeTable::from_table(&FrequencyTable::new()).unwrap();
        assert!(codes.is_empty());
        assert_eq!(codes.max_len(), 0);
    }

    #[test]
    fn test_frequent_symbols_get_shorter_codes() {
        let table = table_of(&[(0, 50), (1, 20), (-1, 20), (500, 5), (-500, 5)]);
        let codes = CodeTable::from_table(&table).unwrap();
        let zero = codes.code(0).unwrap().len;
        assert!(zero <= codes.code(500).unwrap().len);
        assert!(zero <= codes.code(-500).unwrap().len);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        // all weights equal: leaves pop in ascending symbol order
        let table = table_of(&[(-3, 1), (7, 1), (9, 1), (12, 1)]);
        let codes = CodeTable::from_table(&table).unwrap();
        assert_eq!(codes.code(-3).unwrap().to_bit_string(), "00");
        assert_eq!(codes.code(7).unwrap().to_bit_string(), "01");
        assert_eq!(codes.code(9).unwrap().to_bit_string(), "10");
        assert_eq!(codes.code(12).unwrap().to_bit_string(), "11");

        let again = CodeTable::from_table(&table).unwrap();
        for symbol in [-3, 7, 9, 12] {
            assert_eq!(codes.code(symbol), again.code(symbol));
        }
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let table = table_of(&[(1, 1), (2, 2), (3, 4), (4, 8), (5, 16), (6, 32)]);
        let codes = CodeTable::from_table(&table).unwrap();
        let all: Vec<String> = (1..=6)
            .map(|s| codes.code(s).unwrap().to_bit_string())
            .collect();
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a.as_str()), "{} prefixes {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_reverse_lookup() {
        let table = table_of(&[(10, 3), (20, 1), (30, 1)]);
        let codes = CodeTable::from_table(&table).unwrap();
        for symbol in [10, 20, 30] {
            let code = codes.code(symbol).unwrap();
            assert_eq!(codes.lookup(code), Some(symbol));
        }
    }

    #[test]
    fn test_table_bytes_round_trip() {
        let table = table_of(&[(-32768, 2), (0, 5), (32767, 1)]);
        let bytes = table.to_bytes();
        assert_eq!(bytes.len(), 3 * TABLE_ENTRY_SIZE);
        assert_eq!(&bytes[..6], &[0x80, 0x00, 0, 0, 0, 2]);
        assert_eq!(FrequencyTable::from_bytes(&bytes).unwrap(), table);
    }

    #[test]
    fn test_table_rejects_bad_bytes() {
        assert!(FrequencyTable::from_bytes(&[0, 1, 0]).is_err());
        // zero count
        assert!(FrequencyTable::from_bytes(&[0, 1, 0, 0, 0, 0]).is_err());
        // descending symbols
        assert!(FrequencyTable::from_bytes(&[0, 2, 0, 0, 0, 1, 0, 1, 0, 0, 0, 1]).is_err());
    }
}
