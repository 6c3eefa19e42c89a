mod domain;
mod group;
mod ip;
pub mod loader;
mod live;
mod traits;

pub use domain::DomainMixMatcher;
pub use group::MatcherGroup;
pub use ip::{parse_prefix, IpList};
pub use live::LiveMatcher;
pub use traits::{Matcher, RuleSink};
