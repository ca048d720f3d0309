use std::ops::Range;

/// Partition of a token stream into render units (sentence groups or
/// fixed-size token pages).
///
/// Sentence ranges come from the token source and may be stale: a unit can
/// reference token indices past the current token count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitLayout {
    units: Vec<Range<u32>>,
}

impl UnitLayout {
    pub fn fixed(tokens_per_unit: usize, token_count: usize) -> Self {
        let step = tokens_per_unit.max(1);
        let units = (0..token_count)
            .step_by(step)
            .map(|begin| begin as u32..(begin + step).min(token_count) as u32)
            .collect();
        Self { units }
    }

    /// Uses the given sentence ranges, or fixed pages when there are none.
    pub fn from_sentences(ranges: &[(u32, u32)], token_count: usize, tokens_per_unit: usize) -> Self {
        if ranges.is_empty() {
            return Self::fixed(tokens_per_unit, token_count);
        }
        let units = ranges
            .iter()
            .map(|&(begin, end)| begin..end.max(begin))
            .collect();
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, unit: usize) -> Option<Range<u32>> {
        self.units.get(unit).cloned()
    }

    /// The unit holding `token`, assuming units are sorted by start.
    pub fn unit_of_token(&self, token: u32) -> Option<usize> {
        let after = self.units.partition_point(|r| r.start <= token);
        let candidate = after.checked_sub(1)?;
        self.units[candidate].contains(&token).then_some(candidate)
    }
}
