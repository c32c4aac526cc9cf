pub mod event_service;
pub mod mail_service;
pub mod notification_message_service;
