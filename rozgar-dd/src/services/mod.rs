//! Resolution pipeline services

pub mod alias_resolver;
pub mod breakdown;
pub mod cascade;
pub mod district_data;
pub mod geo_resolver;
pub mod resolution_cache;
pub mod synthetic;
pub mod upstream;

pub use cascade::{CascadePolicy, SourceCascade};
pub use district_data::{DataSourceStatus, DistrictDataService, LiveDataFlags, NearestResolution};
pub use geo_resolver::NearestRegion;
pub use resolution_cache::{CacheKey, ResolutionCache};
pub use synthetic::SyntheticGenerator;
pub use upstream::{CandidateSource, DataGovClient, DataGovSettings, UpstreamFetcher};
