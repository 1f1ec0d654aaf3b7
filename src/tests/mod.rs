
mod keys_cmd;
mod scan_cmd;
mod type_index;
