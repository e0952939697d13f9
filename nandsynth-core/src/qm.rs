// SPDX-License-Identifier: Apache-2.0

//! Quine-McCluskey two-level minimization.
//!
//! Prime implicants are generated by repeated pairwise merging of cubes that
//! differ in exactly one cared-about bit. The cover is then chosen by taking
//! essential primes whenever one exists and falling back to a greedy pick
//! (most uncovered minterms, then fewest literals) otherwise. The greedy step
//! means the cover is not guaranteed minimal; callers rely on its exact
//! choices, so it should not be replaced with an exact solver.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::truth_table::TruthTable;

/// A cube over `num_inputs` variables. A set bit in `mask` means "don't care
/// about this position"; `value` is zero at every masked position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implicant {
    pub value: u32,
    pub mask: u32,
    pub num_inputs: usize,
    /// Minterms (not don't-cares) this cube covers.
    pub covered: BTreeSet<u32>,
    pub literal_count: usize,
}

impl Implicant {
    fn from_assignment(assignment: u32, num_inputs: usize, is_minterm: bool) -> Self {
        let mut covered = BTreeSet::new();
        if is_minterm {
            covered.insert(assignment);
        }
        Implicant {
            value: assignment,
            mask: 0,
            num_inputs,
            covered,
            literal_count: num_inputs,
        }
    }

    pub fn covers(&self, assignment: u32) -> bool {
        assignment & !self.mask == self.value
    }

    /// `(input index, polarity)` for every cared-about position, ascending.
    /// Polarity `true` means the input appears uncomplemented.
    pub fn literals(&self) -> Vec<(usize, bool)> {
        (0..self.num_inputs)
            .filter(|i| (self.mask >> i) & 1 == 0)
            .map(|i| (i, (self.value >> i) & 1 == 1))
            .collect()
    }

    fn ones(&self) -> u32 {
        (self.value & !self.mask).count_ones()
    }

    /// Returns the merged cube if `self` and `other` differ in exactly one
    /// cared-about bit.
    fn merge(&self, other: &Implicant) -> Option<Implicant> {
        if self.mask != other.mask {
            return None;
        }
        let diff = (self.value ^ other.value) & !self.mask;
        if diff.count_ones() != 1 {
            return None;
        }
        let mask = self.mask | diff;
        Some(Implicant {
            value: self.value & !mask,
            mask,
            num_inputs: self.num_inputs,
            covered: self.covered.union(&other.covered).copied().collect(),
            literal_count: self.num_inputs - mask.count_ones() as usize,
        })
    }
}

impl std::fmt::Display for Implicant {
    /// Cube notation, most significant input first, e.g. `1-0`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in (0..self.num_inputs).rev() {
            let c = if (self.mask >> i) & 1 == 1 {
                '-'
            } else if (self.value >> i) & 1 == 1 {
                '1'
            } else {
                '0'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimizedFunction {
    pub num_inputs: usize,
    /// The chosen cover. Empty means constant 0.
    pub implicants: Vec<Implicant>,
    pub original_minterm_count: usize,
}

impl MinimizedFunction {
    pub fn evaluate(&self, assignment: u32) -> bool {
        self.implicants.iter().any(|imp| imp.covers(assignment))
    }

    pub fn total_literals(&self) -> usize {
        self.implicants.iter().map(|imp| imp.literal_count).sum()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum MinimizeError {
    /// The merge phase ran past the configured comparison budget.
    BudgetExhausted { steps: usize },
    /// Some minterms are covered by no prime implicant. Indicates a bug in
    /// prime generation rather than a property of the input.
    IncompleteCover { uncovered: Vec<u32> },
}

impl std::fmt::Display for MinimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MinimizeError::BudgetExhausted { steps } => {
                write!(f, "merge budget exhausted after {} comparisons", steps)
            }
            MinimizeError::IncompleteCover { uncovered } => write!(
                f,
                "prime implicants do not cover minterms {:?}",
                uncovered
            ),
        }
    }
}

impl std::error::Error for MinimizeError {}

pub fn quine_mccluskey(table: &TruthTable) -> Result<MinimizedFunction, MinimizeError> {
    quine_mccluskey_with_budget(table, None)
}

/// As `quine_mccluskey`, but gives up with `BudgetExhausted` once more than
/// `max_merge_steps` pairwise merge attempts have been made.
pub fn quine_mccluskey_with_budget(
    table: &TruthTable,
    max_merge_steps: Option<usize>,
) -> Result<MinimizedFunction, MinimizeError> {
    let primes = prime_implicants(table, max_merge_steps)?;
    let implicants = select_cover(&table.minterms, primes)?;
    log::trace!(
        "quine_mccluskey; {} minterms over {} inputs -> {} implicants",
        table.minterms.len(),
        table.num_inputs,
        implicants.len()
    );
    Ok(MinimizedFunction {
        num_inputs: table.num_inputs,
        implicants,
        original_minterm_count: table.minterms.len(),
    })
}

fn prime_implicants(
    table: &TruthTable,
    max_merge_steps: Option<usize>,
) -> Result<Vec<Implicant>, MinimizeError> {
    let n = table.num_inputs;
    let minterm_set: HashSet<u32> = table.minterms.iter().copied().collect();
    let mut seeds: BTreeSet<u32> = minterm_set.iter().copied().collect();
    seeds.extend(table.dont_cares.iter().copied());
    let mut current: Vec<Implicant> = seeds
        .into_iter()
        .map(|a| Implicant::from_assignment(a, n, minterm_set.contains(&a)))
        .collect();

    let mut primes: Vec<Implicant> = Vec::new();
    let mut prime_keys: HashSet<(u32, u32)> = HashSet::new();
    let mut steps = 0usize;
    let mut round = 0usize;

    while !current.is_empty() {
        let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, imp) in current.iter().enumerate() {
            groups.entry(imp.ones()).or_default().push(i);
        }

        let mut used = vec![false; current.len()];
        let mut next: Vec<Implicant> = Vec::new();
        let mut next_keys: HashSet<(u32, u32)> = HashSet::new();
        for (ones, lower) in groups.iter() {
            let Some(upper) = groups.get(&(ones + 1)) else {
                continue;
            };
            for &i in lower {
                for &j in upper {
                    steps += 1;
                    if let Some(limit) = max_merge_steps {
                        if steps > limit {
                            return Err(MinimizeError::BudgetExhausted { steps: limit });
                        }
                    }
                    if let Some(merged) = current[i].merge(&current[j]) {
                        used[i] = true;
                        used[j] = true;
                        if next_keys.insert((merged.value, merged.mask)) {
                            next.push(merged);
                        }
                    }
                }
            }
        }

        for (imp, was_used) in current.into_iter().zip(used) {
            if !was_used && prime_keys.insert((imp.value, imp.mask)) {
                primes.push(imp);
            }
        }
        log::trace!(
            "prime_implicants; round {} produced {} merged cubes, {} primes so far",
            round,
            next.len(),
            primes.len()
        );
        current = next;
        round += 1;
    }
    Ok(primes)
}

fn select_cover(minterms: &[u32], primes: Vec<Implicant>) -> Result<Vec<Implicant>, MinimizeError> {
    let mut uncovered: BTreeSet<u32> = minterms.iter().copied().collect();
    let mut chosen = vec![false; primes.len()];
    let mut order: Vec<usize> = Vec::new();

    while !uncovered.is_empty() {
        let mut essentials: BTreeSet<usize> = BTreeSet::new();
        let mut orphans: Vec<u32> = Vec::new();
        for &m in &uncovered {
            let mut coverers = primes
                .iter()
                .enumerate()
                .filter(|(i, p)| !chosen[*i] && p.covered.contains(&m))
                .map(|(i, _)| i);
            match (coverers.next(), coverers.next()) {
                (None, _) => orphans.push(m),
                (Some(only), None) => {
                    essentials.insert(only);
                }
                _ => {}
            }
        }
        if !orphans.is_empty() {
            return Err(MinimizeError::IncompleteCover { uncovered: orphans });
        }

        let picks: Vec<usize> = if essentials.is_empty() {
            // Greedy: most uncovered minterms, then fewest literals, then
            // earliest generated.
            let best = primes
                .iter()
                .enumerate()
                .filter(|(i, _)| !chosen[*i])
                .map(|(i, p)| (i, p.covered.intersection(&uncovered).count(), p.literal_count))
                .filter(|(_, gain, _)| *gain > 0)
                .min_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));
            match best {
                Some((i, _, _)) => vec![i],
                None => {
                    return Err(MinimizeError::IncompleteCover {
                        uncovered: uncovered.into_iter().collect(),
                    })
                }
            }
        } else {
            essentials.into_iter().collect()
        };

        for i in picks {
            chosen[i] = true;
            order.push(i);
            for m in &primes[i].covered {
                uncovered.remove(m);
            }
        }
    }

    let mut primes: Vec<Option<Implicant>> = primes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| primes[i].take()).collect())
}
