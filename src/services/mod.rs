pub mod analytics_service;
pub mod auth_service;
pub mod batch_service;
pub mod chat_service;
pub mod demo_service;
pub mod payment_service;
pub mod student_service;
pub mod subscription_service;

pub use analytics_service::AnalyticsService;
pub use auth_service::AuthService;
pub use batch_service::BatchService;
pub use chat_service::ChatService;
pub use demo_service::DemoService;
pub use payment_service::PaymentService;
pub use student_service::StudentService;
pub use subscription_service::SubscriptionService;
