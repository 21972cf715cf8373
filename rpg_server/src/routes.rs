//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, calls to the processor,
//! etc.) should be expressed as futures or asynchronous functions, which get executed concurrently by worker threads.
use std::str::FromStr;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use rpg_common::MinorUnits;
use rpg_engine::{
    db_types::OrderId,
    events::WebhookEvent,
    traits::{OrderStore, ProcessorApi},
    AdminApi,
    CheckoutApi,
    Reconciler,
    SessionMode,
};

use crate::{
    data_objects::{AmountParams, CheckoutParams, ConfirmQuery, JsonResponse, OrderParams},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Webhook  ----------------------------------------------------
route!(webhook => Post "/webhook" impl OrderStore, ProcessorApi);
/// Route handler for inbound processor webhook events.
///
/// Events are verified against the account webhook secret before anything else happens. Verified events are
/// dispatched to the reconciler; duplicates are acknowledged with a 200 so the processor stops retrying them.
/// Events with a bad signature, missing fields or an unknown event type return a 400.
pub async fn webhook<S, P>(
    reconciler: web::Data<Reconciler<S, P>>,
    body: web::Json<WebhookEvent>,
) -> HttpResponse
where
    S: OrderStore,
    P: ProcessorApi,
{
    let event = body.into_inner();
    trace!("💻️ Received webhook event {} ({})", event.id, event.event_type);
    match reconciler.handle_webhook(&event).await {
        Ok(outcome) => {
            debug!("💻️ Webhook event {} handled: {outcome:?}", event.id);
            HttpResponse::Ok().json(JsonResponse::success(format!("{outcome:?}")))
        },
        Err(e) => {
            warn!("💻️ Webhook event {} rejected. {e}", event.id);
            HttpResponse::BadRequest().json(JsonResponse::failure(e.to_string()))
        },
    }
}

//----------------------------------------------  Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderStore, ProcessorApi);
/// Route handler for creating a hosted payment session for an order.
///
/// Responds with the session id and the url the customer must be redirected to.
pub async fn checkout<S, P>(
    api: web::Data<CheckoutApi<S, P>>,
    body: web::Json<CheckoutParams>,
) -> Result<HttpResponse, ServerError>
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received checkout session request for order {}", params.order_id);
    let mode =
        if params.change_payment_method { SessionMode::ChangePaymentMethod } else { SessionMode::Checkout };
    let session = api.create_checkout_session(params.order_id, params.save_card, mode).await?;
    info!("💻️ Created checkout session {} for order {}", session.id, params.order_id);
    Ok(HttpResponse::Ok().json(session))
}

route!(confirm => Get "/confirm/{order_id}" impl OrderStore, ProcessorApi);
/// Route handler for the post-redirect payment confirmation.
///
/// Customers land here after the processor redirects them back from a hosted session. The reconciler stores the
/// card token when one was requested, then waits a short while for the corresponding webhook to arrive and falls
/// back to querying the invoice directly.
pub async fn confirm<S, P>(
    reconciler: web::Data<Reconciler<S, P>>,
    path: web::Path<i64>,
    query: web::Query<ConfirmQuery>,
) -> Result<HttpResponse, ServerError>
where
    S: OrderStore,
    P: ProcessorApi,
{
    let order_id = OrderId(path.into_inner());
    trace!("💻️ Received payment confirmation request for order {order_id}");
    let status = reconciler.finalize(order_id, query.payment_method.as_deref()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {order_id} is {status}"))))
}

//----------------------------------------------  Operator commands  ------------------------------------------
route!(capture => Post "/capture" impl OrderStore, ProcessorApi);
/// Captures the outstanding authorized amount of an order.
pub async fn capture<S, P>(api: web::Data<AdminApi<S, P>>, body: web::Json<OrderParams>) -> HttpResponse
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received capture request for order {}", params.order_id);
    let outcome = api.capture(params.order_id, None).await;
    HttpResponse::Ok().json(outcome)
}

route!(capture_partly => Post "/capture_partly" impl OrderStore, ProcessorApi);
/// Captures part of the authorized amount of an order. The amount is given as free text in major units.
pub async fn capture_partly<S, P>(
    api: web::Data<AdminApi<S, P>>,
    body: web::Json<AmountParams>,
) -> Result<HttpResponse, ServerError>
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received partial capture request for order {}", params.order_id);
    let amount = MinorUnits::from_str(&params.amount)
        .map_err(|e| ServerError::InvalidRequestBody(format!("{} is not a valid amount. {e}", params.amount)))?;
    let outcome = api.capture(params.order_id, Some(amount)).await;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(cancel => Post "/cancel" impl OrderStore, ProcessorApi);
/// Cancels the payment for an order and marks the order as cancelled locally.
pub async fn cancel<S, P>(api: web::Data<AdminApi<S, P>>, body: web::Json<OrderParams>) -> HttpResponse
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received cancel request for order {}", params.order_id);
    let outcome = api.cancel(params.order_id).await;
    HttpResponse::Ok().json(outcome)
}

route!(refund => Post "/refund" impl OrderStore, ProcessorApi);
/// Refunds the full refundable remainder of an order.
pub async fn refund<S, P>(api: web::Data<AdminApi<S, P>>, body: web::Json<OrderParams>) -> HttpResponse
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received refund request for order {}", params.order_id);
    let outcome = api.refund(params.order_id, None).await;
    HttpResponse::Ok().json(outcome)
}

route!(refund_partly => Post "/refund_partly" impl OrderStore, ProcessorApi);
/// Refunds part of the settled amount of an order. The amount is given as free text in major units.
pub async fn refund_partly<S, P>(
    api: web::Data<AdminApi<S, P>>,
    body: web::Json<AmountParams>,
) -> Result<HttpResponse, ServerError>
where
    S: OrderStore,
    P: ProcessorApi,
{
    let params = body.into_inner();
    trace!("💻️ Received partial refund request for order {}", params.order_id);
    let amount = MinorUnits::from_str(&params.amount)
        .map_err(|e| ServerError::InvalidRequestBody(format!("{} is not a valid amount. {e}", params.amount)))?;
    let outcome = api.refund(params.order_id, Some(amount)).await;
    Ok(HttpResponse::Ok().json(outcome))
}
