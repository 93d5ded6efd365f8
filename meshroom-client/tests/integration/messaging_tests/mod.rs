mod test_chat_delivery;
