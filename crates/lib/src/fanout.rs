use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use tessera_lib_core::Result;

/// Default work-items-per-worker threshold used by search drivers.
pub const ITEMS_PER_WORKER: usize = 100_000;

/// Bounded intra-query fan-out.
///
/// Spawns `ceil(len / threshold)` workers, capped by the machine's
/// parallelism. Workers pull the next item index from a shared cursor and
/// write into their pre-sized result slot, so the output order matches the
/// input order regardless of scheduling.
pub fn fanout<T, R, F>(items: &[T], threshold: usize, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send + Sync,
    F: Fn(&T) -> Result<R> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let threshold = threshold.max(1);
    let workers = items
        .len()
        .div_ceil(threshold)
        .clamp(1, rayon::current_num_threads());

    if workers == 1 {
        return items.iter().map(&f).collect();
    }

    let cursor = AtomicUsize::new(0);
    let slots: Vec<OnceLock<Result<R>>> = (0..items.len()).map(|_| OnceLock::new()).collect();

    rayon::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|_| {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    if index >= items.len() {
                        break;
                    }
                    let _ = slots[index].set(f(&items[index]));
                }
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| slot.into_inner().unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_keep_input_order() {
        let items: Vec<usize> = (0..1000).collect();
        let results = fanout(&items, 10, |&n| Ok(n * 2)).unwrap();
        assert_eq!(results.len(), 1000);
        assert!(results.iter().enumerate().all(|(i, &r)| r == i * 2));
    }

    #[test]
    fn worker_count_stays_bounded() {
        // A tiny threshold over a tiny input still runs, single worker.
        let results = fanout(&[1, 2, 3], 1, |&n| Ok(n + 1)).unwrap();
        assert_eq!(results, vec![2, 3, 4]);
    }

    #[test]
    fn first_error_surfaces() {
        let items: Vec<usize> = (0..100).collect();
        let result = fanout(&items, 10, |&n| {
            if n == 57 {
                Err(tessera_lib_core::Error::Canceled)
            } else {
                Ok(n)
            }
        });
        assert!(result.is_err());
    }
}
