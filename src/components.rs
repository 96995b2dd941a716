use crate::app::Message;
use crate::session::{CityPrompt, Notification, Severity, WeatherResult};
use iced::{
    alignment, theme,
    widget::{button, column, container, row, text, text_input, Space},
    Alignment, Color, Element, Length,
};

pub fn create_city_prompt<'a>(prompt: &'a CityPrompt, value: &'a str) -> Element<'a, Message> {
    let input = text_input(&prompt.input_name, value)
        .on_input(Message::CityInputChanged)
        .on_submit(Message::SubmitCity)
        .padding(8)
        .size(14)
        .width(Length::Fixed(260.0));

    let confirm = button(text(&prompt.confirm_label).size(14))
        .on_press(Message::SubmitCity)
        .padding([8, 16])
        .style(theme::Button::Primary);

    container(
        column![
            text(&prompt.title).size(18),
            text(&prompt.description)
                .size(14)
                .style(Color::from_rgb(0.4, 0.4, 0.4)),
            row![input, confirm]
                .spacing(10)
                .align_items(Alignment::Center),
        ]
        .spacing(12)
        .align_items(Alignment::Center),
    )
    .padding(16)
    .style(theme::Container::Box)
    .width(Length::Fill)
    .center_x()
    .into()
}

pub fn create_status_display<'a>(city: &str) -> Element<'a, Message> {
    container(text(format!("Loading weather for {}...", city)).size(16))
        .padding(20)
        .center_x()
        .width(Length::Fill)
        .into()
}

pub fn create_result_modal(result: &WeatherResult) -> Element<Message> {
    let summary = match &result.summary {
        Some(summary) => text(summary).size(14),
        None => text("").size(14),
    };

    let close_button = button(
        text("Close")
            .size(14)
            .horizontal_alignment(alignment::Horizontal::Center),
    )
    .on_press(Message::DismissResult)
    .style(theme::Button::Secondary)
    .width(Length::Fixed(90.0));

    container(
        column![
            text(&result.title).size(24),
            Space::with_height(Length::Fixed(10.0)),
            text(&result.text).size(18),
            summary,
            text(format!("Updated: {}", result.fetched_at.format("%I:%M:%S %p")))
                .size(12)
                .style(Color::from_rgb(0.5, 0.5, 0.5)),
            Space::with_height(Length::Fixed(10.0)),
            close_button,
        ]
        .spacing(4)
        .align_items(Alignment::Center),
    )
    .padding(16)
    .style(theme::Container::Box)
    .width(Length::Fixed(360.0))
    .into()
}

pub fn create_notification(notification: &Notification) -> Element<Message> {
    let label = match notification.severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Info => "Info",
        Severity::Success => "Success",
    };

    let close_button = button(text("×").size(14))
        .on_press(Message::DismissNotification(notification.serial))
        .style(theme::Button::Text);

    container(
        row![
            text(format!("{}: {}", label, notification.text))
                .size(14)
                .style(severity_color(notification.severity)),
            Space::with_width(Length::Fill),
            close_button,
        ]
        .align_items(Alignment::Center),
    )
    .padding([8, 16])
    .style(theme::Container::Box)
    .width(Length::Fixed(480.0))
    .into()
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::from_rgb(0.8, 0.2, 0.2),
        Severity::Warning => Color::from_rgb(0.9, 0.6, 0.1),
        Severity::Info => Color::from_rgb(0.2, 0.4, 0.8),
        Severity::Success => Color::from_rgb(0.2, 0.6, 0.3),
    }
}
