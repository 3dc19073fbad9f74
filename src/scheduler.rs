use std::mem;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Finish,
}

type DeferredTask<C> = Box<dyn FnOnce(&mut C)>;
type RecurringTask<C> = Box<dyn FnMut(&mut C) -> TaskControl>;

pub struct Scheduler<C> {
    next_id: u64,
    deferred: Vec<(TaskHandle, DeferredTask<C>)>,
    recurring: Vec<(TaskHandle, RecurringTask<C>)>,
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            deferred: Vec::new(),
            recurring: Vec::new(),
        }
    }

    pub fn defer(&mut self, task: impl FnOnce(&mut C) + 'static) -> TaskHandle {
        let handle = self.next_handle();
        self.deferred.push((handle, Box::new(task)));
        handle
    }

    pub fn every_tick(&mut self, task: impl FnMut(&mut C) -> TaskControl + 'static) -> TaskHandle {
        let handle = self.next_handle();
        self.recurring.push((handle, Box::new(task)));
        handle
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.deferred.len() + self.recurring.len();
        self.deferred.retain(|(task, _)| *task != handle);
        self.recurring.retain(|(task, _)| *task != handle);
        before != self.deferred.len() + self.recurring.len()
    }

    /// Runs the deferred tasks queued so far. Tasks deferred while this runs
    /// wait for the next phase.
    pub fn run_deferred(&mut self, context: &mut C) -> usize {
        let batch = mem::take(&mut self.deferred);
        let count = batch.len();
        for (_, task) in batch {
            task(&mut *context);
        }
        count
    }

    pub fn run_tick(&mut self, context: &mut C) -> usize {
        let count = self.recurring.len();
        self.recurring
            .retain_mut(|(_, task)| task(&mut *context) == TaskControl::Continue);
        count
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn has_recurring(&self) -> bool {
        !self.recurring.is_empty()
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.deferred.iter().any(|(task, _)| *task == handle)
            || self.recurring.iter().any(|(task, _)| *task == handle)
    }

    fn next_handle(&mut self) -> TaskHandle {
        self.next_id += 1;
        TaskHandle(self.next_id)
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}
