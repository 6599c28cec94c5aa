//! Ping request wrapped in tracing, cancellation and validation behaviors.

use errand::{
    handler_fn, CancellationBehavior, HandlerModule, Registrar, Request, TracingBehavior,
    Validate, ValidationBehavior, ValidationError,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Request)]
#[request(response = Pong)]
pub struct Ping {
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pong {
    pub value: i64,
}

impl Validate for Ping {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.value < 0 {
            return Err(ValidationError::new("value", "must be zero or positive"));
        }
        Ok(())
    }
}

pub struct PingModule;

impl HandlerModule for PingModule {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn register(&self, registrar: &mut Registrar<'_>) {
        registrar
            .handler::<Ping, _>(|| {
                handler_fn(|request: &Ping, _cancel: &CancellationToken| {
                    let value = request.value;
                    async move { Ok(Pong { value }) }
                })
            })
            .behavior::<Ping, _>(|| TracingBehavior)
            .behavior::<Ping, _>(|| CancellationBehavior)
            .behavior::<Ping, _>(|| ValidationBehavior);
    }
}
