//! Newsroom that records every notification instead of delivering it.

use paddock_core::news::{NewsKind, Newsroom, OfficeNews, PressNews};
use paddock_env::{EnvError, TeamId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe newsroom used by the harness and tests.
#[derive(Default)]
pub struct RecordingNewsroom {
    press: Mutex<Vec<PressNews>>,
    office: Mutex<Vec<OfficeNews>>,
    /// When set, every delivery fails and only the failure is counted
    failing: AtomicBool,
    failed_deliveries: Mutex<u64>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingNewsroom {
    pub fn new() -> Self {
        Self::default()
    }

    /// A newsroom whose deliveries all fail.
    pub fn failing() -> Self {
        let newsroom = Self::default();
        newsroom.failing.store(true, Ordering::SeqCst);
        newsroom
    }

    pub fn press_news(&self) -> Vec<PressNews> {
        guard(&self.press).clone()
    }

    pub fn office_news(&self) -> Vec<OfficeNews> {
        guard(&self.office).clone()
    }

    pub fn press_of_kind(&self, kind: NewsKind) -> Vec<PressNews> {
        guard(&self.press).iter().filter(|n| n.kind == kind).cloned().collect()
    }

    pub fn office_for(&self, team_id: &TeamId) -> Vec<OfficeNews> {
        guard(&self.office).iter().filter(|n| &n.team_id == team_id).cloned().collect()
    }

    pub fn failed_deliveries(&self) -> u64 {
        *guard(&self.failed_deliveries)
    }

    fn reject(&self, what: &str) -> Result<(), EnvError> {
        if self.failing.load(Ordering::SeqCst) {
            *guard(&self.failed_deliveries) += 1;
            return Err(EnvError::delivery(format!("newsroom offline: {}", what)));
        }
        Ok(())
    }
}

impl Newsroom for RecordingNewsroom {
    fn press(&self, news: PressNews) -> Result<(), EnvError> {
        self.reject(&news.title)?;
        guard(&self.press).push(news);
        Ok(())
    }

    fn office(&self, news: OfficeNews) -> Result<(), EnvError> {
        self.reject(&news.title)?;
        guard(&self.office).push(news);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office(team: &str) -> OfficeNews {
        OfficeNews {
            team_id: TeamId::from(team),
            title: "Qualifying Results".into(),
            message: "A: P1".into(),
            kind: NewsKind::QualifyingResult,
        }
    }

    #[test]
    fn test_records_office_news_per_team() {
        let newsroom = RecordingNewsroom::new();
        Newsroom::office(&newsroom, office("t1")).unwrap();
        Newsroom::office(&newsroom, office("t2")).unwrap();
        assert_eq!(newsroom.office_news().len(), 2);
        assert_eq!(newsroom.office_for(&TeamId::from("t2")).len(), 1);
    }

    #[test]
    fn test_failing_newsroom_counts_failures() {
        let newsroom = RecordingNewsroom::failing();
        let err = Newsroom::office(&newsroom, office("t1")).unwrap_err();
        assert!(matches!(err, EnvError::Delivery(_)));
        assert!(newsroom.office_news().is_empty());
        assert_eq!(newsroom.failed_deliveries(), 1);
    }
}
