pub mod llm;
pub mod mailer;
pub mod razorpay;

pub use llm::LlmClient;
pub use mailer::MailerService;
pub use razorpay::RazorpayClient;
