use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use super::render::{Block, BlockKind};

/// Writes rendered blocks to a terminal stream, skipping unchanged ones.
///
/// Notifications are printed once per id even though they stay in the
/// view model until dismissed.
pub struct FramePrinter<W: Write> {
    out: W,
    shown: BTreeMap<BlockKind, Vec<String>>,
    seen_notifications: BTreeSet<u64>,
}

impl<W: Write> FramePrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: BTreeMap::new(),
            seen_notifications: BTreeSet::new(),
        }
    }

    pub fn print(&mut self, blocks: Vec<Block>) -> io::Result<()> {
        let present: BTreeSet<BlockKind> = blocks.iter().map(|b| b.kind.clone()).collect();
        // A block that disappeared is printed again when it comes back.
        self.shown.retain(|kind, _| present.contains(kind));

        for block in blocks {
            if let BlockKind::Notification(id) = block.kind {
                if !self.seen_notifications.insert(id) {
                    continue;
                }
                write_lines(&mut self.out, &block.lines)?;
                continue;
            }
            if self.shown.get(&block.kind) == Some(&block.lines) {
                continue;
            }
            write_lines(&mut self.out, &block.lines)?;
            self.shown.insert(block.kind, block.lines);
        }
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(kind: BlockKind, line: &str) -> Block {
        Block {
            kind,
            lines: vec![line.to_string()],
        }
    }

    #[test]
    fn unchanged_blocks_are_not_repeated() {
        let mut printer = FramePrinter::new(Vec::new());
        printer
            .print(vec![block(BlockKind::Health, "API online")])
            .unwrap();
        printer
            .print(vec![
                block(BlockKind::Health, "API online"),
                block(BlockKind::Progress, "10%"),
            ])
            .unwrap();
        printer
            .print(vec![
                block(BlockKind::Health, "API online"),
                block(BlockKind::Progress, "30%"),
            ])
            .unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text, "API online\n10%\n30%\n");
    }

    #[test]
    fn notifications_print_once_per_id() {
        let mut printer = FramePrinter::new(Vec::new());
        let note = block(BlockKind::Notification(1), "[!] Upload failed: boom");
        printer.print(vec![note.clone()]).unwrap();
        printer.print(vec![note.clone()]).unwrap();
        printer.print(Vec::new()).unwrap();
        printer.print(vec![note]).unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text, "[!] Upload failed: boom\n");
    }

    #[test]
    fn returning_blocks_are_printed_again() {
        let mut printer = FramePrinter::new(Vec::new());
        printer
            .print(vec![block(BlockKind::Progress, "Uploading...")])
            .unwrap();
        printer.print(Vec::new()).unwrap();
        printer
            .print(vec![block(BlockKind::Progress, "Uploading...")])
            .unwrap();
        let text = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(text, "Uploading...\nUploading...\n");
    }
}
