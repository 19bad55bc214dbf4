use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use academy_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{LlmClient, MailerService, RazorpayClient},
    handlers,
    middlewares::{create_cors, AuthMiddleware},
    realtime::ChatHub,
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // External collaborators
    let razorpay_client = RazorpayClient::new(config.razorpay.clone());
    let mailer_service = MailerService::new(config.mailer.clone());
    let llm_client = LlmClient::new(config.llm.clone());
    let chat_hub = ChatHub::new();

    // Services
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone(), mailer_service);
    let demo_service = DemoService::new(pool.clone(), auth_service.clone());
    let payment_service = PaymentService::new(pool.clone(), razorpay_client);
    let student_service = StudentService::new(pool.clone());
    let batch_service = BatchService::new(pool.clone());
    let subscription_service = SubscriptionService::new(pool.clone());
    let chat_service = ChatService::new(pool.clone(), chat_hub);
    let analytics_service = AnalyticsService::new(pool.clone(), llm_client);

    // Hourly sweep: ACTIVE subscriptions past their due date fall to PAST_DUE.
    {
        let subscription_service_clone = subscription_service.clone();
        tokio::spawn(async move {
            loop {
                match subscription_service_clone.mark_past_due().await {
                    Ok(0) => {}
                    Ok(n) => log::info!("Marked {n} subscriptions as PAST_DUE"),
                    Err(e) => log::error!("Past-due sweep failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });
    }

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(demo_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(student_service.clone()))
            .app_data(web::Data::new(batch_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .app_data(web::Data::new(chat_service.clone()))
            .app_data(web::Data::new(analytics_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::demo_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::student_config)
                    .configure(handlers::batch_config)
                    .configure(handlers::subscription_config)
                    .configure(handlers::admin_config)
                    .configure(handlers::chat_config)
                    .configure(handlers::analytics_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
