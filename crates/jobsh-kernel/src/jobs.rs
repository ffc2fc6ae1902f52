//! The job table: every child process the shell is tracking.
//!
//! [`JobTable`] is plain data, a fixed array of slots plus the next-id
//! counter, with no locking of its own. All shared access goes through
//! [`JobManager`], which pairs the table with a mutex and a condvar.
//! Job notifications print while the lock is held, so listings and
//! state-change reports never interleave.
//!
//! Id assignment: ids count up, wrap back to 1 past the table size, and
//! deleting any job rewinds the counter to one past the largest id still
//! in use.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use nix::unistd::Pid;

/// Capacity of the job table.
pub const MAX_JOBS: usize = 16;

/// Shell-assigned job id, distinct from the pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a job stands. An empty slot is not a state; lookups on pids the
/// table does not know return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    /// Label used by the `jobs` listing.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One tracked child process.
#[derive(Debug, Clone)]
pub struct Job {
    pub pid: Pid,
    pub id: JobId,
    pub state: JobState,
    /// The line as typed, trailing `&` and all. Shown by `jobs` and in
    /// background-launch notifications.
    pub cmdline: String,
}

/// Fixed-capacity registry of jobs. Pure data; callers serialize access.
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
    next_id: u32,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            next_id: 1,
        }
    }

    /// Register a child in the first free slot. Returns `None` when the
    /// table is full; the caller decides how loudly to complain.
    pub fn add(&mut self, pid: Pid, state: JobState, cmdline: &str) -> Option<JobId> {
        if pid.as_raw() < 1 {
            return None;
        }
        let slot = self.slots.iter_mut().find(|s| s.is_none())?;
        let id = JobId(self.next_id);
        self.next_id += 1;
        if self.next_id > MAX_JOBS as u32 {
            self.next_id = 1;
        }
        *slot = Some(Job {
            pid,
            id,
            state,
            cmdline: cmdline.to_string(),
        });
        Some(id)
    }

    /// Remove the job owning `pid` and rewind the id counter to
    /// `max id in use + 1`.
    pub fn delete(&mut self, pid: Pid) -> Option<Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(job) if job.pid == pid))?;
        let job = slot.take();
        self.next_id = self.max_id() + 1;
        job
    }

    /// Largest id currently in use, 0 when empty.
    pub fn max_id(&self) -> u32 {
        self.iter().map(|job| job.id.0).max().unwrap_or(0)
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.iter().find(|job| job.pid == pid)
    }

    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.iter_mut().find(|job| job.pid == pid)
    }

    pub fn find_by_id(&self, id: JobId) -> Option<&Job> {
        self.iter().find(|job| job.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.iter_mut().find(|job| job.id == id)
    }

    /// Pid of the foreground job, if one exists. Callers keep the "at most
    /// one foreground job" invariant; this returns the first match.
    pub fn foreground_pid(&self) -> Option<Pid> {
        self.iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    pub fn id_of(&self, pid: Pid) -> Option<JobId> {
        self.find_by_pid(pid).map(|job| job.id)
    }

    /// Occupied slots in slot order, the order `jobs` lists them.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, synchronized handle to the job table.
///
/// Locking discipline: any read-then-write sequence that must observe a
/// consistent table holds the guard from first read to last write, and
/// notification lines are written while the guard is held. The condvar
/// pairs with the lock so a foreground wait re-checks its condition
/// atomically with reacquisition; a wake-up with the condition still
/// true just goes back to sleep.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<JobsInner>,
}

struct JobsInner {
    table: Mutex<JobTable>,
    fg_changed: Condvar,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(JobsInner {
                table: Mutex::new(JobTable::new()),
                fg_changed: Condvar::new(),
            }),
        }
    }

    /// Acquire the table. A poisoned lock is taken over rather than
    /// propagated; the table itself is never left half-updated.
    pub fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.inner
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake anyone blocked on a foreground condition. Called after every
    /// state transition or removal.
    pub fn notify(&self) {
        self.inner.fg_changed.notify_all();
    }

    /// Block until `pid` is no longer the foreground job. Takes the guard
    /// that was held while the job was registered, so no transition can
    /// slip between registration and the first condition check.
    pub fn wait_foreground<'a>(
        &self,
        guard: MutexGuard<'a, JobTable>,
        pid: Pid,
    ) -> MutexGuard<'a, JobTable> {
        self.inner
            .fg_changed
            .wait_while(guard, |table| table.foreground_pid() == Some(pid))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no job at all holds the foreground. This is what `fg`
    /// waits on after promoting a job.
    pub fn wait_no_foreground<'a>(
        &self,
        guard: MutexGuard<'a, JobTable>,
    ) -> MutexGuard<'a, JobTable> {
        self.inner
            .fg_changed
            .wait_while(guard, |table| table.foreground_pid().is_some())
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    fn full_table() -> JobTable {
        let mut table = JobTable::new();
        for i in 0..MAX_JOBS as i32 {
            assert!(table.add(pid(100 + i), JobState::Background, "cmd").is_some());
        }
        table
    }

    #[test]
    fn ids_count_up_from_one() {
        let mut table = JobTable::new();
        let a = table.add(pid(10), JobState::Foreground, "a").unwrap();
        let b = table.add(pid(11), JobState::Background, "b").unwrap();
        assert_eq!(a, JobId(1));
        assert_eq!(b, JobId(2));
    }

    #[test]
    fn add_rejects_nonpositive_pids() {
        let mut table = JobTable::new();
        assert!(table.add(pid(0), JobState::Background, "x").is_none());
        assert!(table.add(pid(-1), JobState::Background, "x").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn full_table_refuses_new_jobs() {
        let mut table = full_table();
        assert_eq!(table.len(), MAX_JOBS);
        assert!(table.add(pid(999), JobState::Background, "extra").is_none());
        assert!(table.find_by_pid(pid(999)).is_none());
    }

    #[test]
    fn delete_rewinds_next_id_to_max_plus_one() {
        let mut table = JobTable::new();
        table.add(pid(10), JobState::Background, "a").unwrap();
        table.add(pid(11), JobState::Background, "b").unwrap();
        table.add(pid(12), JobState::Background, "c").unwrap();

        // Dropping the middle job must not hand its id back out while a
        // larger id is still live.
        assert!(table.delete(pid(11)).is_some());
        let next = table.add(pid(13), JobState::Background, "d").unwrap();
        assert_eq!(next, JobId(4));
    }

    #[test]
    fn deleting_everything_resets_ids_to_one() {
        let mut table = JobTable::new();
        table.add(pid(10), JobState::Background, "a").unwrap();
        table.add(pid(11), JobState::Background, "b").unwrap();
        table.delete(pid(10)).unwrap();
        table.delete(pid(11)).unwrap();
        assert_eq!(table.add(pid(12), JobState::Background, "c"), Some(JobId(1)));
    }

    #[test]
    fn id_counter_wraps_past_table_size() {
        let mut table = full_table();
        // All sixteen ids handed out; the counter wrapped to 1. Freeing the
        // highest id makes room and rewinds to max + 1.
        assert!(table.delete(pid(100 + MAX_JOBS as i32 - 1)).is_some());
        let id = table.add(pid(500), JobState::Background, "again").unwrap();
        assert_eq!(id, JobId(MAX_JOBS as u32));
    }

    #[test]
    fn occupied_ids_stay_distinct() {
        let mut table = full_table();
        // Free the two highest ids; the rewound counter re-issues exactly
        // those without touching ids still in use.
        table.delete(pid(100 + MAX_JOBS as i32 - 2)).unwrap();
        table.delete(pid(100 + MAX_JOBS as i32 - 1)).unwrap();
        table.add(pid(200), JobState::Background, "n1").unwrap();
        table.add(pid(201), JobState::Background, "n2").unwrap();

        let mut ids: Vec<u32> = table.iter().map(|j| j.id.0).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn at_most_one_foreground_job() {
        let mut table = JobTable::new();
        table.add(pid(10), JobState::Background, "a").unwrap();
        table.add(pid(11), JobState::Foreground, "b").unwrap();
        table.add(pid(12), JobState::Stopped, "c").unwrap();

        assert_eq!(table.foreground_pid(), Some(pid(11)));
        let fg_count = table
            .iter()
            .filter(|j| j.state == JobState::Foreground)
            .count();
        assert_eq!(fg_count, 1);

        table.find_by_pid_mut(pid(11)).unwrap().state = JobState::Stopped;
        assert_eq!(table.foreground_pid(), None);
    }

    #[test]
    fn lookups_by_pid_and_id_agree() {
        let mut table = JobTable::new();
        table.add(pid(42), JobState::Background, "sleep 5 &").unwrap();
        let job = table.find_by_pid(pid(42)).unwrap();
        assert_eq!(job.id, JobId(1));
        assert_eq!(table.id_of(pid(42)), Some(JobId(1)));
        assert_eq!(table.find_by_id(JobId(1)).unwrap().pid, pid(42));
        assert!(table.find_by_id(JobId(9)).is_none());
        assert_eq!(table.id_of(pid(7)), None);
    }

    #[test]
    fn listing_order_is_slot_order() {
        let mut table = JobTable::new();
        table.add(pid(10), JobState::Background, "a").unwrap();
        table.add(pid(11), JobState::Background, "b").unwrap();
        table.add(pid(12), JobState::Background, "c").unwrap();
        // Freeing the middle slot and adding again reuses that slot, so the
        // newest job lists second.
        table.delete(pid(11)).unwrap();
        table.add(pid(13), JobState::Background, "d").unwrap();

        let order: Vec<i32> = table.iter().map(|j| j.pid.as_raw()).collect();
        assert_eq!(order, vec![10, 13, 12]);
    }

    #[test]
    fn state_labels_match_listing_vocabulary() {
        assert_eq!(JobState::Background.label(), "Running");
        assert_eq!(JobState::Foreground.label(), "Foreground");
        assert_eq!(JobState::Stopped.label(), "Stopped");
        // The listing pads labels to a fixed column.
        assert_eq!(format!("{:<11}", JobState::Background), "Running    ");
        assert_eq!(format!("{:<11}", JobState::Foreground), "Foreground ");
    }

    #[test]
    fn manager_wait_returns_once_foreground_moves_on() {
        let jobs = JobManager::new();
        {
            let mut table = jobs.lock();
            table.add(pid(77), JobState::Foreground, "spin").unwrap();
        }

        let waiter = {
            let jobs = jobs.clone();
            std::thread::spawn(move || {
                let guard = jobs.lock();
                let guard = jobs.wait_foreground(guard, pid(77));
                guard.find_by_pid(pid(77)).map(|j| j.state)
            })
        };

        // Give the waiter a moment to park, then transition the job the way
        // a stop notification would.
        std::thread::sleep(std::time::Duration::from_millis(50));
        {
            let mut table = jobs.lock();
            table.find_by_pid_mut(pid(77)).unwrap().state = JobState::Stopped;
        }
        jobs.notify();

        let observed = waiter.join().unwrap();
        assert_eq!(observed, Some(JobState::Stopped));
    }

    #[test]
    fn manager_wait_no_foreground_covers_any_job() {
        let jobs = JobManager::new();
        {
            let mut table = jobs.lock();
            table.add(pid(88), JobState::Foreground, "fg").unwrap();
        }

        let waiter = {
            let jobs = jobs.clone();
            std::thread::spawn(move || {
                let guard = jobs.lock();
                let guard = jobs.wait_no_foreground(guard);
                guard.foreground_pid()
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(50));
        {
            let mut table = jobs.lock();
            table.delete(pid(88)).unwrap();
        }
        jobs.notify();

        assert_eq!(waiter.join().unwrap(), None);
    }
}
