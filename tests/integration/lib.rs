//! Shared fixtures for the railsbox integration tests.

use std::path::Path;
use tempfile::TempDir;

/// Files laid down by [`rails_project`], relative to the root.
pub const PROJECT_FILES: &[(&str, &str)] = &[
    ("Gemfile", "source 'https://rubygems.org'\ngem 'rails', '~> 7.1'\n"),
    ("config/routes.rb", "Rails.application.routes.draw do\n  resources :orders\nend\n"),
    ("config/application.rb", "module Shop\n  class Application < Rails::Application\n  end\nend\n"),
    ("config/database.yml", "production:\n  password: hunter2\n"),
    ("config/master.key", "0123456789abcdef"),
    ("config/credentials.yml.enc", "encrypted"),
    ("app/models/order.rb", "class Order < ApplicationRecord\nend\n"),
    ("app/models/line_item.rb", "class LineItem < ApplicationRecord\nend\n"),
    ("db/schema.rb", "ActiveRecord::Schema[7.1].define do\nend\n"),
    ("db/development.sqlite3", "SQLite format 3"),
    ("log/development.log", "Started GET \"/\""),
    (".env", "STRIPE_KEY=sk_live_123"),
    (".env.production", "STRIPE_KEY=sk_live_456"),
    (".gitignore", "/log/*\n/tmp/*\n*.sqlite3\n!/log/.keep\n"),
];

/// A small Rails-shaped project tree.
pub fn rails_project() -> TempDir {
    let temp = TempDir::new().expect("create temp dir");
    write_files(temp.path(), PROJECT_FILES);
    temp
}

/// Write `files` beneath `root`, creating parent directories.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&full, content).expect("write fixture file");
    }
}
