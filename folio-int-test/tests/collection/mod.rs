mod delete_test;
mod find_test;
