use crate::app::{CityWeatherApp, Message};
use crate::components;
use crate::session::ViewState;
use iced::{
    widget::{column, container, text},
    Alignment, Element, Length,
};

pub fn view(app: &CityWeatherApp) -> Element<Message> {
    let heading = text("Weather page").size(28);

    // City prompt card
    let prompt_card = components::create_city_prompt(app.session.prompt(), &app.city_input);

    let content = column![heading, prompt_card]
        .spacing(16)
        .padding(16)
        .align_items(Alignment::Center);

    let content = match app.session.state() {
        ViewState::Idle => content,
        ViewState::Fetching { city, .. } => content.push(components::create_status_display(city)),
        ViewState::ResultShown(result) => content.push(components::create_result_modal(result)),
        ViewState::NotificationShown(notification) => {
            content.push(components::create_notification(notification))
        }
    };

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(10)
        .into()
}
