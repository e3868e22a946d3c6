use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{ConfirmResetRequest, LoginForm, MessageResponse, RegisterRequest, ResetPasswordRequest, TokenResponse},
        contractors::{ContractorList, CreateContractorRequest},
        orders::{CreateOrderRequest, DeletedOrder, OrderItemInput, OrderList, OrderWithItems, UpdateOrderRequest},
    },
    error::ErrorBody,
    models::{Contractor, Order, OrderItem, User},
    response::{ApiResponse, Meta},
    routes::{auth, contractors, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        auth::activate,
        auth::reset_password,
        auth::confirm_reset_password,
        auth::me,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        orders::order_pdf,
        contractors::list,
        contractors::create
    ),
    components(
        schemas(
            User,
            Contractor,
            Order,
            OrderItem,
            RegisterRequest,
            LoginForm,
            TokenResponse,
            ResetPasswordRequest,
            ConfirmResetRequest,
            MessageResponse,
            OrderItemInput,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderWithItems,
            OrderList,
            DeletedOrder,
            ContractorList,
            CreateContractorRequest,
            params::OrderListQuery,
            health::HealthData,
            ErrorBody,
            Meta,
            ApiResponse<User>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<DeletedOrder>,
            ApiResponse<ContractorList>,
            ApiResponse<Contractor>,
            ApiResponse<MessageResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, activation, password reset and login"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Contractors", description = "Contractor endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
