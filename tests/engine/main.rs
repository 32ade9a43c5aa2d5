mod dispatch;
mod fixtures;
mod modes;
mod projects;
