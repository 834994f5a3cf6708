//! Bounded worker pool over independent items.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

/// Runs `work` over `items` on at most `workers` scoped threads and returns
/// the results in input order. `workers <= 1` runs inline on the caller's
/// thread.
pub(crate) fn run_bounded<T, R, F>(items: Vec<T>, workers: usize, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = items.len();
    if workers <= 1 || count <= 1 {
        return items.into_iter().map(work).collect();
    }

    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(items.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel();
    let work = &work;
    let queue = &queue;

    std::thread::scope(|scope| {
        for _ in 0..workers.min(count) {
            let tx = tx.clone();
            scope.spawn(move || loop {
                let next = match queue.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some((index, item)) = next else {
                    break;
                };
                if tx.send((index, work(item))).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
    for (index, result) in rx {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}
