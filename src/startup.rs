use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{CookiePolicy, TokenAuthority};
use crate::configuration::{Environment, JwtSettings};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    change_current_password, get_current_user, health_check, login, logout, refresh_access_token,
    register,
};
use crate::store::UserStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    jwt_config: JwtSettings,
    environment: Environment,
) -> Result<Server, std::io::Error> {
    let authority = Arc::new(TokenAuthority::new(store.clone(), jwt_config));
    let authority_data = web::Data::from(authority.clone());
    let store_data: web::Data<dyn UserStore> = web::Data::from(store);
    let cookie_policy = web::Data::new(CookiePolicy::for_environment(environment));

    tracing::info!(
        secure_cookies = cookie_policy.is_secure(),
        "Session cookie policy configured"
    );

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)

            // Shared state
            .app_data(authority_data.clone())
            .app_data(store_data.clone())
            .app_data(cookie_policy.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh_access_token))
                    // Protected routes (require a valid access token)
                    .service(
                        web::resource("/logout")
                            .wrap(JwtMiddleware::new(authority.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(JwtMiddleware::new(authority.clone()))
                            .route(web::post().to(change_current_password)),
                    )
                    .service(
                        web::resource("/current-user")
                            .wrap(JwtMiddleware::new(authority.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )

            // Static file serving (must be last to not override API routes)
            .service(fs::Files::new("/", "./public").index_file("index.html"))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
