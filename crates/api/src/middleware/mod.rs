pub mod cron_secret;
