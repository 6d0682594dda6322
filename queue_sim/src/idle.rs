use crate::config::IdleGranularity;

/// Accrues unoccupied server time lazily, at the moment a server is next
/// handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleAccumulator {
    granularity: IdleGranularity,
    pool_idle_since: Option<usize>,
    server_free_since: Vec<usize>,
    total: usize,
    intervals: usize,
}

impl IdleAccumulator {
    /// Every server starts free at t=0.
    pub fn new(granularity: IdleGranularity, servers: usize) -> Self {
        IdleAccumulator {
            granularity,
            pool_idle_since: Some(0),
            server_free_since: vec![0; servers],
            total: 0,
            intervals: 0,
        }
    }

    /// `occupied_before` is the pool occupancy just before this grant.
    pub fn on_grant(&mut self, now: usize, server: usize, occupied_before: usize) {
        let since = match self.granularity {
            IdleGranularity::Server => self.server_free_since.get(server).copied(),
            IdleGranularity::Pool if occupied_before == 0 => self.pool_idle_since.take(),
            IdleGranularity::Pool => None,
        };
        if let Some(since) = since {
            if since < now {
                self.total += now - since;
                self.intervals += 1;
            }
        }
    }

    /// `occupied_after` is the pool occupancy once `server` is freed.
    pub fn on_release(&mut self, now: usize, server: usize, occupied_after: usize) {
        if let Some(free_since) = self.server_free_since.get_mut(server) {
            *free_since = now;
        }
        if occupied_after == 0 {
            self.pool_idle_since = Some(now);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of non-empty idle gaps accrued so far.
    pub fn intervals(&self) -> usize {
        self.intervals
    }
}
