//! 🗓️ Daily partition paths and the object keys that live under them.
//!
//! `daily/<md5-hex(date)>-<date>`: the hash prefix spreads keys across S3 partitions,
//! the date suffix keeps humans oriented. It is a naming scheme, not a secret.

use chrono::{Local, NaiveDate};
use md5::{Digest, Md5};

/// 📅 Today's partition, by the process-local calendar.
pub fn daily_path() -> String {
    daily_path_for(Local::now().date_naive())
}

pub fn daily_path_for(date: NaiveDate) -> String {
    let day = date.format("%Y-%m-%d").to_string();
    let digest = Md5::digest(day.as_bytes());
    format!("daily/{}-{}", hex::encode(digest), day)
}

/// 🗝️ Every destination key a job can produce, for one daily partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArtifactKeys {
    daily: String,
}

impl ArtifactKeys {
    pub(crate) fn new(daily: String) -> Self {
        Self { daily }
    }

    pub(crate) fn advisor_note_permissions(&self) -> String {
        format!("sis-data/sis-sysadm/{}/advisors/advisor-note-permissions.gz", self.daily)
    }

    pub(crate) fn instructor_advisor_map(&self) -> String {
        format!("sis-data/sis-sysadm/{}/advisors/instructor-advisor-map.gz", self.daily)
    }

    pub(crate) fn instructor_updates(&self, term_id: &str) -> String {
        format!("sis-data/{}/instructor-updates-{}.gz", self.daily, term_id)
    }

    pub(crate) fn enrollment_updates(&self, term_id: &str) -> String {
        format!("sis-data/{}/enrollment-updates-{}.gz", self.daily, term_id)
    }

    pub(crate) fn basic_attributes(&self) -> String {
        format!("sis-data/{}/basic-attributes.gz", self.daily)
    }

    pub(crate) fn courses(&self, term_id: &str) -> String {
        format!("sis-data/{}/courses-{}.gz", self.daily, term_id)
    }

    pub(crate) fn enrollments(&self, term_id: &str) -> String {
        format!("sis-data/{}/enrollments-{}.gz", self.daily, term_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_partition_is_hash_then_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            daily_path_for(date),
            "daily/049367183938cfff003fc2ec7f63abe9-2024-01-15"
        );
    }

    #[test]
    fn the_one_where_two_calls_on_one_day_agree() {
        let first = daily_path();
        assert_eq!(first, daily_path());
        assert!(first.starts_with("daily/"));
        assert_eq!(first.len(), "daily/".len() + 32 + 1 + "YYYY-MM-DD".len());
    }

    #[test]
    fn the_one_where_every_key_lands_in_its_area() {
        let keys = ArtifactKeys::new("daily/abc-2024-01-15".into());
        assert_eq!(
            keys.advisor_note_permissions(),
            "sis-data/sis-sysadm/daily/abc-2024-01-15/advisors/advisor-note-permissions.gz"
        );
        assert_eq!(
            keys.instructor_advisor_map(),
            "sis-data/sis-sysadm/daily/abc-2024-01-15/advisors/instructor-advisor-map.gz"
        );
        assert_eq!(keys.instructor_updates("2248"), "sis-data/daily/abc-2024-01-15/instructor-updates-2248.gz");
        assert_eq!(keys.enrollment_updates("2248"), "sis-data/daily/abc-2024-01-15/enrollment-updates-2248.gz");
        assert_eq!(keys.basic_attributes(), "sis-data/daily/abc-2024-01-15/basic-attributes.gz");
        assert_eq!(keys.courses("2252"), "sis-data/daily/abc-2024-01-15/courses-2252.gz");
        assert_eq!(keys.enrollments("2252"), "sis-data/daily/abc-2024-01-15/enrollments-2252.gz");
    }
}
