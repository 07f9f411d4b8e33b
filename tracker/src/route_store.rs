use std::collections::VecDeque;

use shared::{Coordinate, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Keep every accepted point until reset.
    #[default]
    Unbounded,
    /// Drop the oldest points beyond this many.
    KeepLast(usize),
}

/// Ordered path of accepted samples. No two consecutive points are equal.
#[derive(Debug, Clone, Default)]
pub struct RouteStore {
    points: VecDeque<Coordinate>,
    retention: RetentionPolicy,
}

impl RouteStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            points: VecDeque::new(),
            retention,
        }
    }

    /// Returns `false` when `coord` repeats the last point or the retention
    /// window cannot hold it.
    pub fn append(&mut self, coord: Coordinate) -> bool {
        if self.points.back() == Some(&coord) {
            return false;
        }
        self.points.push_back(coord);
        if let RetentionPolicy::KeepLast(max) = self.retention {
            while self.points.len() > max {
                self.points.pop_front();
            }
        }
        !self.points.is_empty()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.back().copied()
    }

    /// Owned copy; later appends do not show through.
    pub fn snapshot(&self) -> Route {
        Route::from(self.points.iter().copied().collect::<Vec<_>>())
    }
}
