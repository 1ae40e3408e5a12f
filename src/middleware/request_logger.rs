use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;

/// Wraps every request in a tracing span carrying a request id and logs
/// method, path, status and latency on completion.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
}

fn response_status<B>(result: &Result<ServiceResponse<B>, Error>) -> u16 {
    match result {
        Ok(res) => res.status().as_u16(),
        Err(e) => e.as_response_error().status_code().as_u16(),
    }
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();

        let span = tracing::info_span!(
            "http_request",
            request_id = %uuid::Uuid::new_v4(),
            method = %method,
            path = %path,
        );

        let service = self.service.clone();

        Box::pin(
            async move {
                tracing::info!("Request started");
                let res = service.call(req).await;

                // Errors raised by inner middleware have not become responses yet
                tracing::info!(
                    status = response_status(&res),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Request completed"
                );

                res
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AuthError};
    use actix_web::{test as actix_test, HttpResponse};

    #[test]
    fn test_status_of_successful_response() {
        let res = actix_test::TestRequest::default().to_srv_response(HttpResponse::Created().finish());
        assert_eq!(response_status(&Ok(res)), 201);
    }

    #[test]
    fn test_status_of_middleware_error() {
        let result: Result<ServiceResponse, Error> =
            Err(AppError::Auth(AuthError::MissingToken).into());
        assert_eq!(response_status(&result), 401);
    }
}
