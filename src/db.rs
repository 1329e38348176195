pub mod company_repo;
pub use company_repo::{CompanyRepository, CompanySpec, PgCompanyRepository};
pub mod geography_repo;
pub use geography_repo::{GeoPath, GeographyRepository, PgGeographyRepository};
pub mod message_repo;
pub use message_repo::PgMessageRepository;
pub mod project_repo;
pub use project_repo::{PgProjectRepository, ProjectRepository, ProjectSpec};
pub mod send_request_repo;
pub use send_request_repo::{PgSendRequestRepository, SendRequestRepository};

pub mod memory;
