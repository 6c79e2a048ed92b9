// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod identity;

pub(crate) use identity::{Identity, Role, Token};
