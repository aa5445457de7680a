//! Maps emitted instruction/directive positions back to source lines, for
//! the debugger's disassembly view.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceMapItem {
    pub start_line: u32,
    pub line_count: u32,
}

pub type SourceMap = Vec<SourceMapItem>;
