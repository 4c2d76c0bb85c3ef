use std::time::Duration;

use actix_web::{http::header::ContentType, web, HttpResponse, Responder};

use crate::{
    config::SubscriptionConfig,
    domain::{ErrorKind, SubscriptionStatus},
    store_client::{StoreClient, SubscriberStore},
    subscription::SubscriptionForm,
};

pub async fn home(
    store: web::Data<StoreClient>,
    settings: web::Data<SubscriptionConfig>,
) -> impl Responder {
    let form = SubscriptionForm::new(store.get_ref());

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render_page(&form, settings.revert_after()))
}

/// A succeeded form with a revert interval reloads the page once the
/// interval elapses. A submitting one reloads shortly after.
pub fn render_page<S: SubscriberStore>(
    form: &SubscriptionForm<S>,
    revert_after: Option<Duration>,
) -> String {
    let refresh = match (form.status(), revert_after) {
        (SubscriptionStatus::Succeeded, Some(after)) => format!(
            r#"<meta http-equiv="refresh" content="{}; url=/#newsletter">"#,
            after.as_secs()
        ),
        (SubscriptionStatus::Submitting, _) => {
            r#"<meta http-equiv="refresh" content="2; url=/#newsletter">"#.to_owned()
        }
        _ => String::new(),
    };

    format!(
        include_str!("home/landing.html"),
        refresh = refresh,
        newsletter = render_newsletter(form),
    )
}

fn render_newsletter<S: SubscriberStore>(form: &SubscriptionForm<S>) -> String {
    let status = form.status();
    let configured = form.is_configured();

    let input_disabled = if !configured || status == SubscriptionStatus::Submitting {
        " disabled"
    } else {
        ""
    };
    let button_disabled = if form.can_submit() { "" } else { " disabled" };
    let button_label = match status {
        SubscriptionStatus::Submitting => "Subscribing...",
        SubscriptionStatus::Succeeded => "Subscribed!",
        _ => "Subscribe now",
    };

    let message = if !configured {
        message_html(
            "notice",
            SubscriptionStatus::Failed {
                reason: ErrorKind::NotConfigured,
            }
            .message(),
        )
    } else {
        match status {
            SubscriptionStatus::Idle => String::new(),
            SubscriptionStatus::Submitting => message_html("info", status.message()),
            SubscriptionStatus::Succeeded => message_html("success", status.message()),
            SubscriptionStatus::Failed { .. } => message_html("error", status.message()),
        }
    };

    format!(
        include_str!("home/newsletter.html"),
        status = status.as_str(),
        email = htmlescape::encode_minimal(&form.email()),
        input_disabled = input_disabled,
        button_disabled = button_disabled,
        button_label = button_label,
        message = message,
    )
}

fn message_html(class: &str, text: &str) -> String {
    format!(
        r#"<p class="message {class}" role="status">{}</p>"#,
        htmlescape::encode_minimal(text)
    )
}
