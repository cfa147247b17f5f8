pub mod send_notifications;
