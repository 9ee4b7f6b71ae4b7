pub mod candidate;
pub mod outreach;
