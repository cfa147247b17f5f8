use crate::app_container::Application;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};
use use_cases::registration::{RegistrationInput, RegistrationOutcome};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RegistrationForm {
    first_name: String,
    email: String,
    lat: String,
    lng: String,
    consent: Option<String>,
}

impl From<RegistrationForm> for RegistrationInput {
    fn from(form: RegistrationForm) -> Self {
        // Checkboxes are only submitted when ticked.
        let consent = matches!(form.consent.as_deref(), Some(value) if !value.is_empty() && value != "false");
        RegistrationInput {
            first_name: form.first_name,
            email: form.email,
            latitude: form.lat,
            longitude: form.lng,
            consent,
        }
    }
}

fn redirect_home() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish()
}

/// Answers every submission with the same redirect; the outcome is only
/// visible in the logs.
#[tracing::instrument(skip(form, app), level = "info")]
async fn register(
    form: Option<web::Form<RegistrationForm>>,
    app: web::Data<Application>,
) -> HttpResponse {
    let Some(form) = form else {
        warn!("Rejected a registration that could not be parsed");
        return redirect_home();
    };

    match app.registration.register(form.into_inner().into()).await {
        Ok(RegistrationOutcome::Registered { user_id, .. }) => info!("Registered user {user_id}"),
        Ok(outcome) => warn!("Registration did not complete: {outcome:?}"),
        Err(err) => warn!("Rejected registration: {err}"),
    }

    redirect_home()
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)));
}
