use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::set_password,
        handlers::demo::book_demo,
        handlers::demo::list_demos,
        handlers::demo::get_demo,
        handlers::demo::schedule_demo,
        handlers::demo::mark_attendance,
        handlers::demo::submit_outcome,
        handlers::demo::coach_mark_attendance,
        handlers::payment::create_order,
        handlers::payment::verify_payment,
        handlers::payment::create_renewal_order,
        handlers::payment::list_payments,
        handlers::student::list_students,
        handlers::student::get_student,
        handlers::student::update_student,
        handlers::batch::create_batch,
        handlers::batch::list_batches,
        handlers::batch::get_batch,
        handlers::batch::delete_batch,
        handlers::batch::add_student,
        handlers::batch::remove_student,
        handlers::subscription::list_subscriptions,
        handlers::subscription::get_subscription,
        handlers::subscription::pause_subscription,
        handlers::subscription::resume_subscription,
        handlers::subscription::cancel_subscription,
        handlers::admin::create_coach,
        handlers::admin::list_coaches,
        handlers::admin::dashboard,
        handlers::chat::create_conversation,
        handlers::chat::list_conversations,
        handlers::chat::list_messages,
        handlers::chat::send_message,
        handlers::chat::set_typing,
        handlers::chat::broadcast,
        handlers::chat::stream_events,
        handlers::analytics::funnel,
        handlers::analytics::revenue,
        handlers::analytics::explain,
    ),
    components(
        schemas(
            AccountRole,
            AccountResponse,
            LoginRequest,
            RefreshRequest,
            SetPasswordRequest,
            AuthResponse,
            CreateCoachRequest,
            DemoStatus,
            StudentInterest,
            CoachAttendance,
            AttendanceOutcome,
            DemoOutcome,
            CoachAttendanceMark,
            DemoResponse,
            BookDemoRequest,
            ScheduleDemoRequest,
            MarkAttendanceRequest,
            SubmitOutcomeRequest,
            CoachAttendanceRequest,
            StudentType,
            StudentStatus,
            StudentResponse,
            UpdateStudentRequest,
            BatchStatus,
            BatchResponse,
            CreateBatchRequest,
            BillingCycle,
            SubscriptionStatus,
            SubscriptionResponse,
            PaymentPurpose,
            PaymentStatus,
            PaymentResponse,
            CreateDemoOrderRequest,
            CreateRenewalOrderRequest,
            OrderResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            ConversationResponse,
            CreateConversationRequest,
            SendMessageRequest,
            Message,
            BroadcastRequest,
            BroadcastResponse,
            TypingRequest,
            StatusCount,
            FunnelReport,
            MonthlyRevenue,
            RevenueReport,
            DashboardSummary,
            ExplainRequest,
            ExplainResponse,
            ApiError,
            PaginationInfo,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "demo", description = "Demo booking funnel API"),
        (name = "payment", description = "Payment gateway API"),
        (name = "student", description = "Student management API"),
        (name = "batch", description = "Batch management API"),
        (name = "subscription", description = "Subscription API"),
        (name = "admin", description = "Admin back-office API"),
        (name = "chat", description = "Chat and broadcast API"),
        (name = "analytics", description = "Analytics and insights API"),
    ),
    info(
        title = "Academy Backend API",
        version = "1.0.0",
        description = "Chess academy back-office REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
