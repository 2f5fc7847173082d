mod calendar;
mod data;
mod helpers;
mod mood;
mod onboard;
mod plan;
mod profile;
mod recipes;
mod remind;
mod today;
mod water;
mod weight;

pub(crate) use calendar::cmd_calendar_export;
pub(crate) use data::{cmd_export, cmd_import, cmd_reset};
pub(crate) use mood::cmd_mood;
pub(crate) use onboard::{OnboardArgs, cmd_onboard};
pub(crate) use plan::cmd_plan_regenerate;
pub(crate) use profile::cmd_profile;
pub(crate) use recipes::{cmd_recipes_list, cmd_recipes_regenerate};
pub(crate) use remind::{cmd_notify_disable, cmd_notify_enable, cmd_notify_status, cmd_remind};
pub(crate) use today::{cmd_done, cmd_today};
pub(crate) use water::cmd_water;
pub(crate) use weight::{cmd_weight_history, cmd_weight_log};
