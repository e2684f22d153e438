use chrono::NaiveDateTime;

use super::domain::{MonitoredItem, StatusCategory};

/// Classifies `item` against `now`. The action deadline wins over the notice deadline.
pub fn classify(item: &MonitoredItem, now: NaiveDateTime) -> StatusCategory {
    if now >= item.time_for_next_action {
        StatusCategory::Overdue
    } else if now >= item.time_for_next_notice {
        StatusCategory::NoticeDue
    } else {
        StatusCategory::Normal
    }
}

impl MonitoredItem {
    pub fn status(&self, now: NaiveDateTime) -> StatusCategory {
        classify(self, now)
    }

    pub fn overdue(&self, now: NaiveDateTime) -> bool {
        classify(self, now) == StatusCategory::Overdue
    }

    pub fn notice_due(&self, now: NaiveDateTime) -> bool {
        classify(self, now) == StatusCategory::NoticeDue
    }
}
