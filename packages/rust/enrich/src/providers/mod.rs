//! Concrete enrichment modules.
//!
//! Website modules fetch the company's own pages; search and AI modules need
//! their API client and contribute nothing without one.

mod about;
mod classifier;
mod domain;
mod ecommerce;
mod email;
mod industry;
mod linkedin;
mod news;
mod owner;
mod revenue;
mod traffic;

pub use about::AboutScraper;
pub use classifier::AiClassifier;
pub use domain::{DomainNormalizer, canonical_url};
pub use ecommerce::EcommerceDetector;
pub use email::EmailFinder;
pub use industry::IndustryTagger;
pub use linkedin::LinkedInFinder;
pub use news::NewsFinder;
pub use owner::OwnerFinder;
pub use revenue::{RevenueEstimator, estimate_revenue};
pub use traffic::TrafficEstimator;
