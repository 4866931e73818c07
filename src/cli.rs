// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn id_arg() -> Arg {
    Arg::new("id").long("id").required(true).help("Record id")
}

fn notes_arg() -> Arg {
    Arg::new("notes").long("notes").help("Admin notes")
}

fn schedule_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("start-date")
            .long("start-date")
            .required(true)
            .help("YYYY-MM-DD"),
    )
    .arg(
        Arg::new("end-date")
            .long("end-date")
            .required(true)
            .help("YYYY-MM-DD"),
    )
    .arg(
        Arg::new("start-time")
            .long("start-time")
            .help("Pickup time HH:MM (default 09:00)"),
    )
    .arg(
        Arg::new("end-time")
            .long("end-time")
            .help("Return time HH:MM (default 18:00)"),
    )
}

pub fn build_cli() -> Command {
    Command::new("ebike-rental")
        .version(crate_version!())
        .about("E-bike rental marketplace: bookings, payments, availability and provider payouts")
        .arg(
            Arg::new("as")
                .long("as")
                .global(true)
                .value_name("USERNAME")
                .help("Act as this user"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("user")
                .about("Manage riders, providers and admins")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("username").long("username").required(true))
                        .arg(Arg::new("email").long("email").default_value(""))
                        .arg(
                            Arg::new("role")
                                .long("role")
                                .required(true)
                                .value_parser(["rider", "provider", "admin"]),
                        ),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(
                    Command::new("verify")
                        .about("Verify or revoke a vehicle provider (admin)")
                        .arg(Arg::new("provider").long("provider").required(true))
                        .arg(
                            Arg::new("revoke")
                                .long("revoke")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(notes_arg()),
                )
                .subcommand(
                    Command::new("fee-paid")
                        .about("Record a provider's registration fee as paid (admin)")
                        .arg(Arg::new("provider").long("provider").required(true)),
                ),
        )
        .subcommand(
            Command::new("bike")
                .about("E-bike fleet")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("description")
                                .long("description")
                                .default_value(""),
                        )
                        .arg(
                            Arg::new("price-per-day")
                                .long("price-per-day")
                                .required(true),
                        )
                        .arg(
                            Arg::new("price-per-week")
                                .long("price-per-week")
                                .required(true),
                        )
                        .arg(Arg::new("image").long("image").default_value("")),
                )
                .subcommand(json_args(
                    Command::new("list")
                        .arg(
                            Arg::new("available")
                                .long("available")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(Arg::new("provider").long("provider")),
                )),
        )
        .subcommand(
            Command::new("booking")
                .about("Booking lifecycle")
                .subcommand(schedule_args(
                    Command::new("create").arg(Arg::new("bike").long("bike").required(true)),
                ))
                .subcommand(json_args(Command::new("list")))
                .subcommand(json_args(Command::new("show").arg(id_arg())))
                .subcommand(Command::new("approve").arg(id_arg()))
                .subcommand(Command::new("reject").arg(id_arg()))
                .subcommand(Command::new("cancel").arg(id_arg()))
                .subcommand(Command::new("delete").arg(id_arg()))
                .subcommand(schedule_args(Command::new("reschedule").arg(id_arg()))),
        )
        .subcommand(
            Command::new("pay")
                .about("Gateway checkout")
                .subcommand(
                    json_args(Command::new("order"))
                        .arg(Arg::new("booking").long("booking").required(true)),
                )
                .subcommand(
                    Command::new("verify")
                        .arg(Arg::new("booking").long("booking").required(true))
                        .arg(Arg::new("order-id").long("order-id").required(true))
                        .arg(Arg::new("payment-id").long("payment-id").required(true))
                        .arg(Arg::new("signature").long("signature").required(true)),
                )
                .subcommand(
                    Command::new("webhook")
                        .about("Process a gateway webhook delivery")
                        .arg(
                            Arg::new("body-file")
                                .long("body-file")
                                .required(true)
                                .help("File holding the raw request body"),
                        )
                        .arg(Arg::new("signature").long("signature").required(true)),
                ),
        )
        .subcommand(
            Command::new("withdrawal")
                .about("Provider payouts")
                .subcommand(
                    Command::new("request")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("transfer-type")
                                .long("transfer-type")
                                .default_value("bank")
                                .value_parser(["bank", "upi"]),
                        )
                        .arg(Arg::new("account-holder-name").long("account-holder-name"))
                        .arg(Arg::new("account-number").long("account-number"))
                        .arg(Arg::new("ifsc-code").long("ifsc-code"))
                        .arg(Arg::new("bank-name").long("bank-name"))
                        .arg(Arg::new("upi-id").long("upi-id")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("approve").arg(id_arg()).arg(notes_arg()))
                .subcommand(Command::new("reject").arg(id_arg()).arg(notes_arg()))
                .subcommand(
                    Command::new("complete")
                        .arg(id_arg())
                        .arg(
                            Arg::new("transaction-id")
                                .long("transaction-id")
                                .required(true),
                        )
                        .arg(notes_arg()),
                ),
        )
        .subcommand(
            Command::new("earnings")
                .about("Provider ledger")
                .subcommand(json_args(
                    Command::new("show").arg(
                        Arg::new("provider")
                            .long("provider")
                            .help("Provider username (admins only)"),
                    ),
                ))
                .subcommand(json_args(Command::new("summary"))),
        )
        .subcommand(
            Command::new("document")
                .about("Provider verification documents")
                .subcommand(
                    Command::new("submit")
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .value_parser([
                                    "aadhar",
                                    "pan",
                                    "driving_license",
                                    "business_license",
                                    "insurance",
                                    "other",
                                ]),
                        )
                        .arg(Arg::new("file").long("file").required(true))
                        .arg(Arg::new("number").long("number")),
                )
                .subcommand(
                    Command::new("review")
                        .arg(id_arg())
                        .arg(
                            Arg::new("status")
                                .long("status")
                                .required(true)
                                .value_parser(["approved", "rejected"]),
                        )
                        .arg(notes_arg()),
                )
                .subcommand(json_args(Command::new("list").arg(
                    Arg::new("status")
                        .long("status")
                        .value_parser(["pending", "approved", "rejected"]),
                ))),
        )
        .subcommand(
            Command::new("notifications")
                .about("In-app notifications")
                .subcommand(json_args(
                    Command::new("list").arg(
                        Arg::new("unread")
                            .long("unread")
                            .action(ArgAction::SetTrue),
                    ),
                ))
                .subcommand(Command::new("read").arg(id_arg())),
        )
        .subcommand(
            Command::new("receipt")
                .about("Receipts for settled bookings and payouts")
                .subcommand(json_args(Command::new("booking").arg(id_arg())))
                .subcommand(json_args(Command::new("withdrawal").arg(id_arg()))),
        )
        .subcommand(
            Command::new("sync-bike-availability")
                .about("Recompute every bike's availability from its bookings")
                .arg(
                    Arg::new("silent")
                        .long("silent")
                        .action(ArgAction::SetTrue)
                        .help("Print nothing unless something fails"),
                ),
        )
        .subcommand(
            Command::new("doctor").about("Report bikes whose availability flag has drifted"),
        )
}
