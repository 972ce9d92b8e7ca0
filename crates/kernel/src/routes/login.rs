//! Demonstration login form.
//!
//! No account store backs this; a successful submission only greets the
//! user by name.

use axum::extract::{RawQuery, State};
use axum::http::{self, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_sessions::Session;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::form::{Form, IDENTITY_FIELD, TOKEN_FIELD};
use crate::request::{ParamStore, Request};
use crate::session::{self, MemorySession};
use crate::state::AppState;
use crate::theme::TemplateSink;

const FORM_NAME: &str = "login";

fn build_login_form(state: &AppState, store: &mut MemorySession) -> AppResult<Form> {
    let mut form = Form::builder(FORM_NAME)
        .action("/login")
        .defaults(&state.form_defaults())
        .build_with_token(store);

    form.add_text("username", None)?
        .set_attribute("autocomplete", "username");
    form.add_password("password", None)?;
    form.add_checkbox("remember", false)?;
    form.add_button("login", "Sign in", None)?;
    Ok(form)
}

fn render_form(state: &AppState, form: &Form, request: &Request) -> AppResult<String> {
    let mut sink = TemplateSink::new();
    form.parse(request, &mut sink)?;
    Ok(state.theme().render("login.html", &sink)?)
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    session: Session,
    RawQuery(query): RawQuery,
) -> AppResult<Html<String>> {
    let mut store = session::load(&session).await?;
    let form = build_login_form(&state, &mut store)?;
    session::persist(&session, &store).await?;

    let request = Request::new(http::Method::GET)
        .with_query(ParamStore::from_urlencoded(query.as_deref().unwrap_or_default()));
    Ok(Html(render_form(&state, &form, &request)?))
}

/// POST /login
async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    body: String,
) -> AppResult<Response> {
    let mut store = session::load(&session).await?;
    let mut form = build_login_form(&state, &mut store)?;
    session::persist(&session, &store).await?;

    let mut request =
        Request::new(http::Method::POST).with_body(ParamStore::from_urlencoded(&body));
    form.cleanup_fields(&mut request);

    if !form.is_submitted(&request) {
        return Err(AppError::BadRequest("not a login form submission".to_string()));
    }

    form.element_mut("username")?
        .is_filled(&request, "Please enter your username.");
    if form
        .element_mut("password")?
        .is_filled(&request, "Please enter your password.")
    {
        form.element_mut("password")?.is_valid_against_regexp(
            &request,
            r"^.{8,}$",
            "Passwords have at least 8 characters.",
        )?;
    }

    if !form.is_correct(&request, &store, false) {
        let html = render_form(&state, &form, &request)?;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
    }

    let values = form.values(&request, [IDENTITY_FIELD, TOKEN_FIELD, "password"]);
    let username = values
        .get("username")
        .map(ToString::to_string)
        .unwrap_or_default();
    info!(%username, "login form accepted");

    let mut context = tera::Context::new();
    context.insert("username", &username);
    let html = state.theme().render_context("welcome.html", &context)?;
    Ok(Html(html).into_response())
}

/// Create the login router.
pub fn router() -> Router<AppState> {
    Router::new().route("/login", get(login_page).post(login_submit))
}
