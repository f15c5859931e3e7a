use std::time::{Duration, Instant};

type Task<S> = Box<dyn FnOnce(&mut S)>;

/// One-shot callbacks run by the event loop once their delay has passed.
///
/// Tasks only run from [`DeferredQueue::run_due`], on the loop thread, so they
/// never preempt other work. There is no cancellation.
pub struct DeferredQueue<S> {
    tasks: Vec<(Instant, Task<S>)>,
}

impl<S> DeferredQueue<S> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn single_shot(&mut self, delay: Duration, task: impl FnOnce(&mut S) + 'static) {
        self.single_shot_at(Instant::now() + delay, task);
    }

    pub fn single_shot_at(&mut self, due: Instant, task: impl FnOnce(&mut S) + 'static) {
        self.tasks.push((due, Box::new(task)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task due at `now`, earliest first. Returns how many ran.
    pub fn run_due(&mut self, now: Instant, target: &mut S) -> usize {
        let mut ran = 0;

        while let Some(index) = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, (due, _))| *due <= now)
            .min_by_key(|(_, (due, _))| *due)
            .map(|(index, _)| index)
        {
            let (_, task) = self.tasks.remove(index);
            task(target);
            ran += 1;
        }

        ran
    }
}

impl<S> Default for DeferredQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}
