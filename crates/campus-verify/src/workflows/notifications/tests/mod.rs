mod mail;
mod notifier;
