//! Where refresh ticks get their next snapshot from.

use crate::types::WellRecord;
use crate::util::round_to;
use rand::Rng;

/// Produces the next full well snapshot on each refresh tick.
pub trait DataSource {
    fn next_snapshot(&mut self, current: &[WellRecord]) -> Vec<WellRecord>;

    fn source_name(&self) -> &str;
}

/// Nudges Producing wells by a small random step each tick. Other wells
/// pass through unchanged.
pub struct RandomWalkSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomWalkSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> DataSource for RandomWalkSource<R> {
    fn next_snapshot(&mut self, current: &[WellRecord]) -> Vec<WellRecord> {
        current
            .iter()
            .map(|w| {
                let mut next = w.clone();
                if next.is_producing() {
                    let step = self.rng.gen_range(-10.0..10.0);
                    next.production = (w.production as f64 + step).round().max(0.0) as i64;
                    next.change = round_to(self.rng.gen_range(-2.0..2.0), 1);
                }
                next
            })
            .collect()
    }

    fn source_name(&self) -> &str {
        "random-walk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn well(id: u32, status: WellStatus, production: i64) -> WellRecord {
        WellRecord {
            id,
            name: format!("Paloch #{}", id),
            field: "Paloch".to_string(),
            status,
            production,
            change: 0.0,
            water_cut: 20.0,
        }
    }

    #[test]
    fn only_producing_wells_move() {
        let wells = vec![
            well(1, WellStatus::Producing, 1000),
            well(2, WellStatus::ShutIn, 0),
            well(3, WellStatus::Drilling, 120),
        ];
        let mut source = RandomWalkSource::new(StdRng::seed_from_u64(7));
        let next = source.next_snapshot(&wells);

        assert_eq!(next.len(), 3);
        assert!((next[0].production - 1000).abs() <= 10);
        assert!(next[0].change.abs() <= 2.0);
        assert_eq!(next[1], wells[1]);
        assert_eq!(next[2], wells[2]);
        assert_eq!(next.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn production_never_goes_negative() {
        let mut wells = vec![well(1, WellStatus::Producing, 3)];
        let mut source = RandomWalkSource::new(StdRng::seed_from_u64(42));
        for _ in 0..500 {
            wells = source.next_snapshot(&wells);
            assert!(wells[0].production >= 0);
        }
    }
}
