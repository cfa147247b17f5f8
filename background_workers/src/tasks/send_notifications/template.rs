use entities::notifications::NotificationMessage;

const UNKNOWN_EVENT: &str = "Unknown Event";
const NO_INSTRUCTIONS: &str = "No instructions provided. Stay alert and follow official guidance.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderedEmail {
    pub subject: String,
    pub plain_text: String,
}

fn value_or<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
}

pub(crate) fn render(message: &NotificationMessage) -> RenderedEmail {
    let event = value_or(&message.event, UNKNOWN_EVENT);
    let subject = format!("Weather Alert: {event}");

    let plain_text = format!(
        "{event}\n\n\
         Headline: {headline}\n\
         Area: {area}\n\
         Severity: {severity} | Certainty: {certainty} | Urgency: {urgency}\n\n\
         Description: {description}\n\n\
         Instructions: {instruction}\n\
         Response: {response}\n\n\
         Source: {source}\n\
         More info: {link}\n\n",
        headline = value_or(&message.headline, "No headline provided."),
        area = value_or(&message.area_desc, "Unknown area"),
        severity = value_or(&message.severity, "N/A"),
        certainty = value_or(&message.certainty, "N/A"),
        urgency = value_or(&message.urgency, "N/A"),
        description = value_or(&message.description, "No description provided."),
        instruction = value_or(&message.instruction, NO_INSTRUCTIONS),
        response = value_or(&message.response, "Unknown"),
        source = value_or(&message.sender_name, "Unknown source"),
        link = value_or(&message.link, "N/A"),
    );

    RenderedEmail {
        subject,
        plain_text,
    }
}
