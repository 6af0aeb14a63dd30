use std::fmt::Write;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use indoc::formatdoc;

use crate::{
    model::processed_email::ProcessedMessage,
    util::{title_case, truncate_chars},
};

pub const EMPTY_REPORT: &str = "No emails to report on.";

const HIGH_PRIORITY_SHOWN: usize = 5;
const SUBJECT_CHARS: usize = 60;

/// Aggregate view of one run
#[derive(Debug)]
pub struct SummaryReport<'a> {
    pub total: usize,
    /// In first-seen order
    pub category_counts: IndexMap<&'a str, usize>,
    pub high_priority: Vec<&'a ProcessedMessage>,
}

impl<'a> SummaryReport<'a> {
    pub fn from_processed(emails: &'a [ProcessedMessage]) -> Self {
        let mut category_counts = IndexMap::new();
        let mut high_priority = Vec::new();

        for email in emails {
            *category_counts
                .entry(email.analysis.category.as_str())
                .or_insert(0) += 1;

            if email.analysis.is_high_priority() {
                high_priority.push(email);
            }
        }

        Self {
            total: emails.len(),
            category_counts,
            high_priority,
        }
    }

    pub fn render(&self, generated_at: DateTime<Local>) -> String {
        if self.total == 0 {
            return EMPTY_REPORT.to_string();
        }

        let mut report = formatdoc! {"
            EMAIL PROCESSING REPORT
            Generated: {generated}

            SUMMARY:
            - Total emails processed: {total}
            - High priority emails: {high}

            CATEGORIES:
            ",
            generated = generated_at.format("%Y-%m-%d %H:%M:%S"),
            total = self.total,
            high = self.high_priority.len(),
        };

        for (category, count) in &self.category_counts {
            let _ = writeln!(report, "- {}: {} emails", title_case(category), count);
        }

        if !self.high_priority.is_empty() {
            report.push_str("\nHIGH PRIORITY EMAILS:\n");
            for email in self.high_priority.iter().take(HIGH_PRIORITY_SHOWN) {
                let _ = writeln!(
                    report,
                    "- {}... (from: {})",
                    truncate_chars(&email.email.subject, SUBJECT_CHARS),
                    email.email.sender
                );
            }
        }

        report
    }
}

pub fn generate_report(emails: &[ProcessedMessage]) -> String {
    if emails.is_empty() {
        return EMPTY_REPORT.to_string();
    }
    SummaryReport::from_processed(emails).render(Local::now())
}
