mod activation;
mod helpers;
mod lifecycle;
mod loopback;
mod notifier;
