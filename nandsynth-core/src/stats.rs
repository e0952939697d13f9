// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::levelize::LevelizedNetlist;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NetlistSummary {
    pub name: String,
    pub signals: usize,
    pub nand_gates: usize,
    pub dffs: usize,
    pub intrinsics: usize,
    pub behavioral_modules: usize,
    pub max_level: u32,
    /// Gate count per level, index 0 first.
    pub gates_per_level: Vec<usize>,
    pub signal_buffer_size: usize,
}

pub fn summarize<A>(levelized: &LevelizedNetlist<A>) -> NetlistSummary {
    let n = &levelized.netlist;
    NetlistSummary {
        name: n.name.clone(),
        signals: n.signals.len(),
        nand_gates: n.nand_gates.len(),
        dffs: n.dffs.len(),
        intrinsics: n.intrinsics.len(),
        behavioral_modules: n.behavioral_modules.len(),
        max_level: levelized.max_level,
        gates_per_level: levelized.levels.iter().map(Vec::len).collect(),
        signal_buffer_size: levelized.signal_buffer_size,
    }
}

impl std::fmt::Display for NetlistSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "netlist: {}", self.name)?;
        writeln!(f, "  signals:            {}", self.signals)?;
        writeln!(f, "  nand gates:         {}", self.nand_gates)?;
        writeln!(f, "  dffs:               {}", self.dffs)?;
        writeln!(f, "  intrinsics:         {}", self.intrinsics)?;
        writeln!(f, "  behavioral modules: {}", self.behavioral_modules)?;
        writeln!(f, "  max level:          {}", self.max_level)?;
        writeln!(f, "  signal buffer:      {} words", self.signal_buffer_size)?;
        for (level, count) in self.gates_per_level.iter().enumerate().skip(1) {
            writeln!(f, "  level {:>4}: {} gates", level, count)?;
        }
        Ok(())
    }
}
