//! Fork/join helpers over a fixed worker count, with a deterministic
//! serial fallback that guarantees identical output across runs.

/// How row and J-range passes are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Number of worker threads to fork across (ignored when `deterministic`).
    pub worker_count: usize,
    /// When `true`, every pass runs serially on the calling thread in a
    /// fixed order, eliminating the scheduling race SGD otherwise accepts.
    pub deterministic: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            worker_count: 4,
            deterministic: false,
        }
    }
}

impl Schedule {
    /// Split `len` contiguous indices into chunks for this schedule: one
    /// chunk total when deterministic, otherwise up to `worker_count`
    /// near-even chunks.
    pub fn chunk_ranges(&self, len: usize) -> Vec<std::ops::Range<usize>> {
        if len == 0 {
            return Vec::new();
        }
        if self.deterministic {
            return vec![0..len];
        }
        let workers = self.worker_count.max(1).min(len);
        let base = len / workers;
        let extra = len % workers;
        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0;
        for w in 0..workers {
            let chunk_len = base + if w < extra { 1 } else { 0 };
            if chunk_len == 0 {
                continue;
            }
            ranges.push(start..start + chunk_len);
            start += chunk_len;
        }
        ranges
    }

    /// Run `f` once per chunk of `items`, in parallel unless
    /// `deterministic`, and collect the per-chunk results in chunk order.
    pub fn fork_join<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&[T]) -> R + Sync,
    {
        let ranges = self.chunk_ranges(items.len());
        if self.deterministic {
            return ranges.into_iter().map(|r| f(&items[r])).collect();
        }
        std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|r| {
                    let chunk = &items[r];
                    scope.spawn(|| f(chunk))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("worker thread panicked"))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ranges_cover_everything_without_gaps() {
        let schedule = Schedule {
            worker_count: 3,
            deterministic: false,
        };
        let ranges = schedule.chunk_ranges(10);
        let covered: usize = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(covered, 10);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn deterministic_schedule_is_a_single_chunk() {
        let schedule = Schedule {
            worker_count: 8,
            deterministic: true,
        };
        assert_eq!(schedule.chunk_ranges(10), vec![0..10]);
    }

    #[test]
    fn fork_join_sums_match_serial_sum() {
        let items: Vec<i64> = (0..997).collect();
        let parallel = Schedule {
            worker_count: 4,
            deterministic: false,
        }
        .fork_join(&items, |chunk| chunk.iter().sum::<i64>());
        let serial_total: i64 = items.iter().sum();
        assert_eq!(parallel.iter().sum::<i64>(), serial_total);
    }
}
