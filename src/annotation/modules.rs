use crate::annotation::io::{Line, ParseError};
use crate::config::{FeatureKind, FeatureTypes};

/// Unit of work handed to the intron engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// Comment or blank line, flushed on its own at its stream position.
    Break(Line),
    /// A gene record and everything up to the next gene record or break.
    /// The first module of a stream may start without a gene record.
    Module(Vec<Line>),
}

/// Groups a line stream into gene modules.
///
/// A module opens at each gene record (or at start of stream) and closes at
/// the next gene record, a comment, a blank line or end of input. Opaque
/// lines never open a module; they stay where they are inside the current one.
pub struct GeneModules<'a, I> {
    lines: I,
    types: &'a FeatureTypes,
    current: Vec<Line>,
    pending: Option<ModuleItem>,
}

impl<'a, I> GeneModules<'a, I>
where
    I: Iterator<Item = Result<Line, ParseError>>,
{
    pub fn new(lines: I, types: &'a FeatureTypes) -> Self {
        Self {
            lines,
            types,
            current: Vec::new(),
            pending: None,
        }
    }

    fn is_gene(&self, line: &Line) -> bool {
        line.as_record()
            .map(|r| r.kind(self.types) == FeatureKind::Gene)
            .unwrap_or(false)
    }
}

impl<'a, I> Iterator for GeneModules<'a, I>
where
    I: Iterator<Item = Result<Line, ParseError>>,
{
    type Item = Result<ModuleItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            return Some(Ok(item));
        }

        loop {
            let line = match self.lines.next() {
                None => {
                    if self.current.is_empty() {
                        return None;
                    }
                    return Some(Ok(ModuleItem::Module(std::mem::take(&mut self.current))));
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(line)) => line,
            };

            if line.is_structural_break() {
                if self.current.is_empty() {
                    return Some(Ok(ModuleItem::Break(line)));
                }
                self.pending = Some(ModuleItem::Break(line));
                return Some(Ok(ModuleItem::Module(std::mem::take(&mut self.current))));
            }

            if self.is_gene(&line) && !self.current.is_empty() {
                let done = std::mem::replace(&mut self.current, vec![line]);
                return Some(Ok(ModuleItem::Module(done)));
            }

            self.current.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::io::AnnotationReader;
    use std::io::Cursor;

    fn group(data: &str) -> Vec<ModuleItem> {
        let types = FeatureTypes::default();
        let lines = AnnotationReader::new(Cursor::new(data.as_bytes())).lines();
        GeneModules::new(lines, &types)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn module_len(item: &ModuleItem) -> usize {
        match item {
            ModuleItem::Module(lines) => lines.len(),
            ModuleItem::Break(_) => 0,
        }
    }

    #[test]
    fn modules_split_at_genes_and_breaks() {
        let data = "\
##gff-version 3
chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=g1
chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=t1;Parent=g1
chr1\tsrc\tgene\t200\t300\t.\t+\t.\tID=g2
chr1\tsrc\tmRNA\t200\t300\t.\t+\t.\tID=t2;Parent=g2

chr1\tsrc\tgene\t400\t500\t.\t+\t.\tID=g3
";
        let items = group(data);
        assert_eq!(items.len(), 5);
        assert!(matches!(&items[0], ModuleItem::Break(Line::Comment(_))));
        assert_eq!(module_len(&items[1]), 2);
        assert_eq!(module_len(&items[2]), 2);
        assert!(matches!(&items[3], ModuleItem::Break(Line::Blank(_))));
        assert_eq!(module_len(&items[4]), 1);
    }

    #[test]
    fn leading_records_form_a_module_without_gene() {
        let data = "\
chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=t0
chr1\tsrc\texon\t1\t100\t.\t+\t.\tParent=t0
chr1\tsrc\tgene\t200\t300\t.\t+\t.\tID=g2
";
        let items = group(data);
        assert_eq!(items.len(), 2);
        assert_eq!(module_len(&items[0]), 2);
        assert_eq!(module_len(&items[1]), 1);
    }

    #[test]
    fn opaque_lines_stay_inside_the_module() {
        let data = "\
chr1\tsrc\tgene\t1\t100\t.\t+\t.\tID=g1
chr1\tsrc\tgene
chr1\tsrc\tmRNA\t1\t100\t.\t+\t.\tID=t1;Parent=g1
";
        let items = group(data);
        assert_eq!(items.len(), 1);
        assert_eq!(module_len(&items[0]), 3);
    }
}
