use std::sync::Arc;
use std::time::Duration;

use iced::{event, window, Application, Command, Element, Event, Subscription, Theme};
use tracing::{debug, info};

use crate::session::{CityPrompt, FetchRequest, Session};
use crate::view;
use crate::weather::{self, FetchOutcome, WeatherClient};

/// How long a notification stays up unless replaced.
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(6);

pub struct AppContext {
    pub api_key: Option<String>,
    pub prompt: CityPrompt,
    pub client: Arc<dyn WeatherClient>,
}

#[derive(Debug, Clone)]
pub enum Message {
    CityInputChanged(String),
    SubmitCity,
    WeatherFetched(FetchOutcome),
    DismissResult,
    DismissNotification(u64),
    CloseRequested,
}

/// What `update` has to schedule after a message was handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    Fetch(FetchRequest),
    HideNotificationAfter(u64),
    Close,
}

pub struct CityWeatherApp {
    pub session: Session,
    pub city_input: String,
    client: Arc<dyn WeatherClient>,
}

impl CityWeatherApp {
    pub fn from_context(context: AppContext) -> Self {
        let city_input = context.prompt.initial_city.clone();
        Self {
            session: Session::new(context.api_key, context.prompt),
            city_input,
            client: context.client,
        }
    }

    pub fn handle(&mut self, message: Message) -> Effect {
        let shown_before = self.session.notification().map(|n| n.serial);

        match message {
            Message::CityInputChanged(value) => {
                self.city_input = value;
                Effect::None
            }
            Message::SubmitCity => {
                let city = self.city_input.trim().to_string();
                match self.session.submit_city(city) {
                    Some(request) => Effect::Fetch(request),
                    None => self.notification_effect(shown_before),
                }
            }
            Message::WeatherFetched(outcome) => {
                let applied = self.session.apply_outcome(outcome);
                debug!(?applied, "weather outcome handled");
                self.notification_effect(shown_before)
            }
            Message::DismissResult => {
                self.session.dismiss_result();
                Effect::None
            }
            Message::DismissNotification(serial) => {
                self.session.dismiss_notification(serial);
                Effect::None
            }
            Message::CloseRequested => {
                info!("window closing");
                self.session.teardown();
                Effect::Close
            }
        }
    }

    fn notification_effect(&self, shown_before: Option<u64>) -> Effect {
        match self.session.notification() {
            Some(n) if Some(n.serial) != shown_before => Effect::HideNotificationAfter(n.serial),
            _ => Effect::None,
        }
    }
}

impl Application for CityWeatherApp {
    type Message = Message;
    type Theme = Theme;
    type Executor = iced::executor::Default;
    type Flags = AppContext;

    fn new(flags: AppContext) -> (CityWeatherApp, Command<Message>) {
        (CityWeatherApp::from_context(flags), Command::none())
    }

    fn title(&self) -> String {
        String::from("City Weather - Iced")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match self.handle(message) {
            Effect::None => Command::none(),
            Effect::Fetch(request) => Command::perform(
                weather::fetch(self.client.clone(), request),
                Message::WeatherFetched,
            ),
            Effect::HideNotificationAfter(serial) => Command::perform(
                tokio::time::sleep(NOTIFICATION_TIMEOUT),
                move |_| Message::DismissNotification(serial),
            ),
            Effect::Close => window::close(window::Id::MAIN),
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, _status| match event {
            Event::Window(_, window::Event::CloseRequested) => Some(Message::CloseRequested),
            _ => None,
        })
    }

    fn theme(&self) -> Theme {
        Theme::Light
    }

    fn view(&self) -> Element<Message> {
        view::view(self)
    }
}
